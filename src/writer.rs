use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write, stdout};

use crate::bp_class::ClassSpec;
use crate::coverage::{ClassCounts, GlobalTotals, RoiCoverage};
use crate::errors::{AppError, Result};
use flate2::Compression;
use flate2::write::GzEncoder;

pub const NOTE_LINE: &str = "#NOTE: Last line in file shows non-overlapping totals across all ROIs";
pub const TOTALS_TAG: &str = "#NonOverlappingTotals";

/// Destination of the report: stdout for `-`, gzip for `*.gz`, plain file
/// otherwise.
pub enum ReportOutput {
    Stdout(BufWriter<Stdout>),
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl ReportOutput {
    pub fn create(path: &str) -> Result<Self> {
        if path == "-" {
            return Ok(Self::Stdout(BufWriter::new(stdout())));
        }

        let file = File::create(path).map_err(|err| AppError::OpenResource {
            kind: "output file",
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        let buffered = BufWriter::new(file);
        if path.ends_with(".gz") {
            Ok(Self::Gzip(GzEncoder::new(buffered, Compression::default())))
        } else {
            Ok(Self::Plain(buffered))
        }
    }

    /// Flushes everything, writing the gzip trailer when compressing.
    pub fn finish(self) -> Result<()> {
        match self {
            Self::Stdout(mut out) => out.flush()?,
            Self::Plain(mut out) => out.flush()?,
            Self::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for ReportOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::Plain(out) => out.write(buf),
            Self::Gzip(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::Plain(out) => out.flush(),
            Self::Gzip(out) => out.flush(),
        }
    }
}

pub fn header_lines(classes: &ClassSpec) -> [String; 2] {
    let mut columns = vec!["#Gene", "ROI", "Length", "Covered"]
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    columns.extend(classes.labels().map(|label| format!("{label}s_Covered")));
    [NOTE_LINE.to_string(), columns.join("\t")]
}

pub fn write_header<W: Write + ?Sized>(writer: &mut W, classes: &ClassSpec) -> Result<()> {
    for line in header_lines(classes) {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

pub fn write_roi_row<W: Write + ?Sized>(writer: &mut W, row: &RoiCoverage) -> Result<()> {
    write!(
        writer,
        "{}\t{}:{}-{}\t{}\t",
        row.roi.label,
        row.roi.chromosome,
        row.interval.beg + 1,
        row.interval.end,
        row.roi.length(),
    )?;
    write_counts(writer, &row.counts)
}

pub fn write_totals<W: Write + ?Sized>(writer: &mut W, totals: &GlobalTotals) -> Result<()> {
    write!(writer, "{TOTALS_TAG}\t\t\t")?;
    write_counts(writer, totals)
}

fn write_counts<W: Write + ?Sized>(writer: &mut W, counts: &ClassCounts) -> Result<()> {
    write!(writer, "{}", counts.covered)?;
    for count in &counts.per_class {
        write!(writer, "\t{count}")?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}
