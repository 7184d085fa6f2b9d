use crate::cli::CalcRoiCovgArgs;
use crate::coverage::{CoverageAccumulator, GlobalTotals, RoiCoverage};
use crate::depth_gate::DepthGate;
use crate::errors::{AppError, Result};
use crate::htslib_pileup::{BamPileupSource, FastaSequenceSource, HtslibInputs};
use crate::roi::{Roi, RoiLine, read_rois};
use crate::writer::{self, ReportOutput};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Write};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// ROIs sharing one chromosome, consecutive in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeBatch<'a> {
    pub chromosome: &'a str,
    pub rois: Vec<(usize, &'a Roi)>,
}

#[derive(Debug)]
struct BatchOutcome {
    rows: Vec<RoiCoverage>,
    totals: GlobalTotals,
    skipped: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reported: usize,
    pub skipped: usize,
    pub covered_total: u64,
}

pub fn run(args: &CalcRoiCovgArgs) -> Result<RunSummary> {
    info!(
        bam1 = %args.bam1,
        bam2 = %args.bam2,
        rois = %args.roi_file,
        reference = %args.ref_fasta,
        output = %args.output,
        min_mapq = args.min_mapq,
        min_depth_bam1 = args.min_depth_bam1,
        min_depth_bam2 = args.min_depth_bam2,
        classes = args.classes.len(),
        threads = args.threads,
        "starting ROI coverage run"
    );
    let started = Instant::now();
    let (inputs, lines, mut output) = open_resources(args)?;

    writer::write_header(&mut output, &args.classes)?;
    let summary = if args.threads > 1 {
        drop(inputs);
        run_parallel(args, &lines, &mut output)?
    } else {
        run_sequential(args, inputs, &lines, &mut output)?
    };
    output.finish()?;

    info!(
        reported = summary.reported,
        skipped = summary.skipped,
        covered_total = summary.covered_total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        output = %args.output,
        "completed ROI coverage run"
    );
    Ok(summary)
}

/// Opens every input and the output. All failures are logged before the run
/// aborts, and nothing is processed unless everything opened.
fn open_resources(
    args: &CalcRoiCovgArgs,
) -> Result<(HtslibInputs, Vec<RoiLine>, ReportOutput)> {
    let sample1 = BamPileupSource::open(&args.bam1);
    let sample2 = BamPileupSource::open(&args.bam2);
    let reference = FastaSequenceSource::open(&args.ref_fasta);
    let rois = open_rois(&args.roi_file);
    let output = ReportOutput::create(&args.output);

    match (sample1, sample2, reference, rois, output) {
        (Ok(sample1), Ok(sample2), Ok(reference), Ok(rois), Ok(output)) => Ok((
            HtslibInputs {
                sample1,
                sample2,
                reference,
            },
            rois,
            output,
        )),
        (sample1, sample2, reference, rois, output) => {
            let failures = [
                sample1.err(),
                sample2.err(),
                reference.err(),
                rois.err(),
                output.err(),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
            for failure in &failures {
                error!("{failure}");
            }
            Err(AppError::ResourcesUnavailable {
                count: failures.len(),
            })
        }
    }
}

fn open_rois(path: &str) -> Result<Vec<RoiLine>> {
    let file = File::open(path).map_err(|err| AppError::OpenResource {
        kind: "ROI file",
        path: path.to_string(),
        reason: err.to_string(),
    })?;
    read_rois(BufReader::new(file))
}

fn new_accumulator(args: &CalcRoiCovgArgs) -> CoverageAccumulator {
    CoverageAccumulator::new(
        args.classes.clone(),
        DepthGate::new(args.min_mapq, args.min_depth_bam1),
        DepthGate::new(args.min_mapq, args.min_depth_bam2),
    )
}

fn run_sequential(
    args: &CalcRoiCovgArgs,
    mut inputs: HtslibInputs,
    lines: &[RoiLine],
    output: &mut dyn Write,
) -> Result<RunSummary> {
    let mut accumulator = new_accumulator(args);
    let progress = RoiProgress::new(args.progress, lines.len());
    let mut summary = RunSummary::default();

    for line in lines {
        progress.advance(line);
        let (line_number, roi) = match line {
            RoiLine::Region { line_number, roi } => (*line_number, roi),
            RoiLine::Rejected { line_number, error } => {
                warn_skipped(*line_number, error);
                summary.skipped += 1;
                continue;
            }
        };

        match process_roi(&mut accumulator, &mut inputs, line_number, roi)? {
            Some(row) => {
                writer::write_roi_row(output, &row)?;
                summary.reported += 1;
            }
            None => summary.skipped += 1,
        }
    }

    let totals = accumulator.into_totals();
    writer::write_totals(output, &totals)?;
    progress.finish();
    summary.covered_total = totals.covered;
    Ok(summary)
}

/// Runs each chromosome batch on its own worker with private readers, cache and
/// totals. Batches never share a chromosome run, so merging their totals gives
/// the same non-overlapping counts as the sequential pass.
fn run_parallel(
    args: &CalcRoiCovgArgs,
    lines: &[RoiLine],
    output: &mut dyn Write,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let progress = RoiProgress::new(args.progress, lines.len());
    for line in lines {
        if let RoiLine::Rejected { line_number, error } = line {
            progress.advance(line);
            warn_skipped(*line_number, error);
            summary.skipped += 1;
        }
    }

    let batches = chromosome_batches(lines);
    let pool = ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .map_err(|err| AppError::Internal {
            message: format!("failed to initialize rayon thread pool: {err}"),
        })?;
    info!(
        batches = batches.len(),
        threads = args.threads,
        "processing chromosome batches in parallel"
    );

    let outcomes = pool.install(|| {
        batches
            .par_iter()
            .map_init(
                || HtslibInputs::open(args),
                |inputs, batch| -> Result<BatchOutcome> {
                    let inputs = inputs.as_mut().map_err(|err| AppError::Internal {
                        message: format!("worker failed to open inputs: {err}"),
                    })?;
                    run_batch(args, inputs, batch, &progress)
                },
            )
            .collect::<Result<Vec<_>>>()
    })?;

    let mut totals = GlobalTotals::new(args.classes.len());
    for outcome in &outcomes {
        for row in &outcome.rows {
            writer::write_roi_row(output, row)?;
        }
        summary.reported += outcome.rows.len();
        summary.skipped += outcome.skipped;
        totals.merge(&outcome.totals);
    }
    writer::write_totals(output, &totals)?;
    progress.finish();
    summary.covered_total = totals.covered;
    Ok(summary)
}

fn run_batch(
    args: &CalcRoiCovgArgs,
    inputs: &mut HtslibInputs,
    batch: &ChromosomeBatch<'_>,
    progress: &RoiProgress,
) -> Result<BatchOutcome> {
    let mut accumulator = new_accumulator(args);
    let mut rows = Vec::with_capacity(batch.rois.len());
    let mut skipped = 0;

    for &(line_number, roi) in &batch.rois {
        progress.advance_roi(roi);
        match process_roi(&mut accumulator, inputs, line_number, roi)? {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    Ok(BatchOutcome {
        rows,
        totals: accumulator.into_totals(),
        skipped,
    })
}

/// Splits usable ROIs into maximal runs of the same chromosome, in input order.
pub fn chromosome_batches(lines: &[RoiLine]) -> Vec<ChromosomeBatch<'_>> {
    let mut batches: Vec<ChromosomeBatch<'_>> = Vec::new();
    for line in lines {
        let RoiLine::Region { line_number, roi } = line else {
            continue;
        };
        match batches.last_mut() {
            Some(batch) if batch.chromosome == roi.chromosome => {
                batch.rois.push((*line_number, roi));
            }
            _ => batches.push(ChromosomeBatch {
                chromosome: &roi.chromosome,
                rois: vec![(*line_number, roi)],
            }),
        }
    }
    batches
}

/// `Ok(None)` when the ROI was skipped for a per-record reason.
fn process_roi(
    accumulator: &mut CoverageAccumulator,
    inputs: &mut HtslibInputs,
    line_number: usize,
    roi: &Roi,
) -> Result<Option<RoiCoverage>> {
    if let Some(error) = inputs.missing_contig(&roi.chromosome) {
        warn_skipped(line_number, &error);
        return Ok(None);
    }

    match accumulator.process_roi(
        roi,
        &mut inputs.sample1,
        &mut inputs.sample2,
        &mut inputs.reference,
    ) {
        Ok(row) => Ok(Some(row)),
        Err(error) if error.is_recoverable() => {
            warn_skipped(line_number, &error);
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

fn warn_skipped(line_number: usize, error: &AppError) {
    warn!(line = line_number, "Skipping invalid ROI: {error}");
}

#[derive(Debug)]
struct RoiProgress {
    progress_bar: Option<ProgressBar>,
}

impl RoiProgress {
    fn new(enabled: bool, total: usize) -> Self {
        let progress_bar = enabled.then(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(4));
            let style = ProgressStyle::with_template(
                "{spinner:.green} {elapsed_precise} [{bar:30}] {pos}/{len} ROIs {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        });
        Self { progress_bar }
    }

    fn advance(&self, line: &RoiLine) {
        match line {
            RoiLine::Region { roi, .. } => self.advance_roi(roi),
            RoiLine::Rejected { .. } => {
                if let Some(bar) = &self.progress_bar {
                    bar.inc(1);
                }
            }
        }
    }

    fn advance_roi(&self, roi: &Roi) {
        if let Some(bar) = &self.progress_bar {
            bar.inc(1);
            bar.set_message(format!("{}:{}-{}", roi.chromosome, roi.start, roi.end));
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.progress_bar {
            bar.finish_with_message("done");
        }
    }
}

impl Drop for RoiProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.progress_bar
            && !bar.is_finished()
        {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::chromosome_batches;
    use crate::roi::read_rois;
    use std::io::Cursor;

    #[test]
    fn batches_follow_contiguous_chromosome_runs() {
        let input = "chr1\t10\t20\ta\nchr1\t15\t30\tb\nbad\nchr2\t5\t9\tc\nchr1\t1\t5\td\n";
        let lines = read_rois(Cursor::new(input)).expect("expected read success");
        let batches = chromosome_batches(&lines);

        let shape = batches
            .iter()
            .map(|batch| {
                (
                    batch.chromosome,
                    batch
                        .rois
                        .iter()
                        .map(|(line, roi)| (*line, roi.label.as_str()))
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            shape,
            vec![
                ("chr1", vec![(1, "a"), (2, "b")]),
                ("chr2", vec![(4, "c")]),
                ("chr1", vec![(5, "d")]),
            ]
        );
    }

    #[test]
    fn no_usable_rois_means_no_batches() {
        let lines = read_rois(Cursor::new("# only a comment\n\nbad line\n"))
            .expect("expected read success");
        assert!(chromosome_batches(&lines).is_empty());
    }
}
