//! Regions of interest: `chrom start end label` lines with 1-based, inclusive
//! coordinates. The file must be sorted by chromosome.

use crate::errors::{AppError, Result};
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roi {
    pub chromosome: String,
    /// 1-based, inclusive.
    pub start: u64,
    /// 1-based, inclusive.
    pub end: u64,
    pub label: String,
}

/// 0-based half-open interval an ROI is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiInterval {
    pub beg: u64,
    pub end: u64,
}

impl RoiInterval {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.beg)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: u64) -> bool {
        position >= self.beg && position < self.end
    }
}

impl Roi {
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = |reason: &str| AppError::InvalidRoi {
            line: line.trim_end().to_string(),
            reason: reason.to_string(),
        };

        let mut fields = line.split_whitespace();
        let (Some(chromosome), Some(start), Some(end), Some(label)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid(
                "expected tab-delimited [chrom, start, stop, annotation]",
            ));
        };

        let start = start
            .parse::<u64>()
            .map_err(|_| invalid("start is not a non-negative integer"))?;
        let end = end
            .parse::<u64>()
            .map_err(|_| invalid("stop is not a non-negative integer"))?;

        if start == 0 {
            return Err(invalid("start must be a 1-based locus"));
        }
        if start > end {
            return Err(invalid("start is greater than stop"));
        }

        Ok(Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            label: label.to_string(),
        })
    }

    /// Bases spanned by the ROI as written in the input.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Converts to 0-based half-open coordinates on a chromosome of
    /// `chromosome_len` bases. The stop is clamped to the chromosome, and a
    /// region touching either chromosome end loses that terminal base so every
    /// evaluated position has both neighbors.
    pub fn interval(&self, chromosome_len: u64) -> Result<RoiInterval> {
        let mut beg = self.start - 1;
        let mut end = self.end.min(chromosome_len);
        if beg >= end {
            return Err(AppError::InvalidRoi {
                line: self.to_string(),
                reason: format!("start lies beyond the chromosome end ({chromosome_len})"),
            });
        }

        if beg == 0 {
            beg += 1;
        }
        if end == chromosome_len {
            end -= 1;
        }
        Ok(RoiInterval { beg, end })
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.chromosome, self.start, self.end, self.label
        )
    }
}

/// One line of ROI input, already split into usable regions and rejects.
#[derive(Debug)]
pub enum RoiLine {
    Region { line_number: usize, roi: Roi },
    Rejected { line_number: usize, error: AppError },
}

/// Reads all ROI lines. Blank lines and `#` comments are dropped; malformed
/// lines come back as [`RoiLine::Rejected`] so the caller can report and skip
/// them. Only read failures are errors.
pub fn read_rois<R: BufRead>(reader: R) -> Result<Vec<RoiLine>> {
    let mut rois = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let line_number = index + 1;
        rois.push(match Roi::parse(&line) {
            Ok(roi) => RoiLine::Region { line_number, roi },
            Err(error) => RoiLine::Rejected { line_number, error },
        });
    }
    Ok(rois)
}

#[cfg(test)]
mod tests {
    use super::{Roi, RoiInterval, RoiLine, read_rois};
    use std::io::Cursor;

    #[test]
    fn parses_tab_delimited_record() {
        let roi = Roi::parse("20\t44429404\t44429608\tELMO2\n").expect("expected parse success");
        assert_eq!(roi.chromosome, "20");
        assert_eq!(roi.start, 44429404);
        assert_eq!(roi.end, 44429608);
        assert_eq!(roi.label, "ELMO2");
        assert_eq!(roi.length(), 205);
    }

    #[test]
    fn ignores_trailing_columns() {
        let roi = Roi::parse("MT 5903 7445 MT-CO1 extra stuff").expect("expected parse success");
        assert_eq!(roi.label, "MT-CO1");
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(Roi::parse("20\t100\t200").is_err());
        assert!(Roi::parse("20\tabc\t200\tGENE").is_err());
        assert!(Roi::parse("20\t-5\t200\tGENE").is_err());
        assert!(Roi::parse("20\t0\t200\tGENE").is_err());
        assert!(Roi::parse("20\t300\t200\tGENE").is_err());
    }

    #[test]
    fn single_base_roi_is_valid() {
        let roi = Roi::parse("1\t50\t50\tX").expect("expected parse success");
        assert_eq!(roi.length(), 1);
        assert_eq!(roi.interval(100).expect("in range"), RoiInterval { beg: 49, end: 50 });
    }

    #[test]
    fn converts_to_half_open() {
        let roi = Roi::parse("1\t101\t200\tA").expect("expected parse success");
        let interval = roi.interval(1_000).expect("in range");
        assert_eq!(interval, RoiInterval { beg: 100, end: 200 });
        assert_eq!(interval.len(), 100);
        assert!(interval.contains(100));
        assert!(!interval.contains(200));
    }

    #[test]
    fn shrinks_at_chromosome_start() {
        let roi = Roi::parse("1\t1\t10\tA").expect("expected parse success");
        assert_eq!(roi.interval(100).expect("in range"), RoiInterval { beg: 1, end: 10 });
    }

    #[test]
    fn shrinks_and_clamps_at_chromosome_end() {
        let roi = Roi::parse("1\t91\t100\tA").expect("expected parse success");
        assert_eq!(roi.interval(100).expect("in range"), RoiInterval { beg: 90, end: 99 });

        let past_end = Roi::parse("1\t91\t150\tA").expect("expected parse success");
        assert_eq!(past_end.interval(100).expect("in range"), RoiInterval { beg: 90, end: 99 });
    }

    #[test]
    fn whole_tiny_chromosome_becomes_empty() {
        let roi = Roi::parse("1\t1\t2\tA").expect("expected parse success");
        let interval = roi.interval(2).expect("in range");
        assert_eq!(interval, RoiInterval { beg: 1, end: 1 });
        assert!(interval.is_empty());
    }

    #[test]
    fn rejects_start_past_chromosome_end() {
        let roi = Roi::parse("1\t101\t150\tA").expect("expected parse success");
        assert!(roi.interval(100).is_err());
    }

    #[test]
    fn reads_lines_and_keeps_rejects() {
        let input = "# header\n1\t10\t20\tA\n\nbad line\n2\t5\t1\tB\n2\t5\t9\tC\n";
        let lines = read_rois(Cursor::new(input)).expect("expected read success");
        assert_eq!(lines.len(), 4);

        let regions = lines
            .iter()
            .filter_map(|line| match line {
                RoiLine::Region { line_number, roi } => Some((*line_number, roi.label.as_str())),
                RoiLine::Rejected { .. } => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(regions, vec![(2, "A"), (6, "C")]);

        let rejected = lines
            .iter()
            .filter_map(|line| match line {
                RoiLine::Rejected { line_number, .. } => Some(*line_number),
                RoiLine::Region { .. } => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(rejected, vec![4, 5]);
    }
}
