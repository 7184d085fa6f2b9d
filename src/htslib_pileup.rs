use crate::cli::CalcRoiCovgArgs;
use crate::depth_gate::{PileupColumn, ReadObservation};
use crate::errors::{AppError, Result};
use crate::sources::{Columns, PileupSource, SequenceSource};
use bio::io::fasta;
use rust_htslib::bam;
use rust_htslib::bam::Read;
use std::fs::File;
use std::path::Path;

/// Indexed BAM read as a stream of pileup columns.
///
/// htslib's default pileup mask drops unmapped, secondary, QC-failed and
/// duplicate reads before they reach a column.
pub struct BamPileupSource {
    path: String,
    reader: bam::IndexedReader,
}

impl BamPileupSource {
    pub fn open(path: &str) -> Result<Self> {
        if !Path::new(path).is_file() {
            return Err(AppError::OpenResource {
                kind: "BAM file",
                path: path.to_string(),
                reason: "no such file".to_string(),
            });
        }
        let reader = bam::IndexedReader::from_path(path).map_err(|err| AppError::OpenResource {
            kind: "BAM index for",
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            path: path.to_string(),
            reader,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn tid(&self, contig: &str) -> Result<u32> {
        self.reader
            .header()
            .tid(contig.as_bytes())
            .ok_or_else(|| AppError::UnknownChromosome {
                chromosome: contig.to_string(),
                source_name: format!("BAM header of {}", self.path),
            })
    }
}

impl PileupSource for BamPileupSource {
    fn has_contig(&self, contig: &str) -> bool {
        self.reader.header().tid(contig.as_bytes()).is_some()
    }

    fn columns(&mut self, contig: &str, beg: u64, end: u64) -> Result<Columns<'_>> {
        let tid = self.tid(contig)?;
        self.reader
            .fetch((tid, beg, end))
            .map_err(|err| AppError::Htslib {
                message: format!(
                    "failed BAM fetch for {contig}:{}-{end} in {}: {err}",
                    beg + 1,
                    self.path
                ),
            })?;

        let chromosome = contig.to_string();
        let pileups = self.reader.pileup();
        Ok(Box::new(pileups.map(move |pileup| {
            let pileup = pileup.map_err(|err| AppError::Htslib {
                message: format!("failed pileup iteration for {chromosome}: {err}"),
            })?;
            let reads = pileup
                .alignments()
                .map(|alignment| ReadObservation {
                    mapping_quality: alignment.record().mapq(),
                    is_deletion: alignment.is_del(),
                })
                .collect();
            Ok(PileupColumn::new(u64::from(pileup.pos()), reads))
        })))
    }
}

/// Reference sequences from a faidx-indexed FASTA.
pub struct FastaSequenceSource {
    path: String,
    reader: fasta::IndexedReader<File>,
}

impl FastaSequenceSource {
    pub fn open(path: &str) -> Result<Self> {
        let reader =
            fasta::IndexedReader::from_file(&path).map_err(|err| AppError::OpenResource {
                kind: "indexed reference FASTA",
                path: path.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            path: path.to_string(),
            reader,
        })
    }
}

impl SequenceSource for FastaSequenceSource {
    fn fetch_sequence(&mut self, contig: &str) -> Result<Vec<u8>> {
        self.reader
            .fetch_all(contig)
            .map_err(|_| AppError::UnknownChromosome {
                chromosome: contig.to_string(),
                source_name: format!("reference {}", self.path),
            })?;

        let mut bases = Vec::new();
        self.reader
            .read(&mut bases)
            .map_err(|err| AppError::ParseError {
                message: format!("failed FASTA read for {contig} in {}: {err}", self.path),
            })?;
        Ok(bases)
    }
}

/// The three indexed inputs one worker reads from.
pub struct HtslibInputs {
    pub sample1: BamPileupSource,
    pub sample2: BamPileupSource,
    pub reference: FastaSequenceSource,
}

impl HtslibInputs {
    pub fn open(args: &CalcRoiCovgArgs) -> Result<Self> {
        Ok(Self {
            sample1: BamPileupSource::open(&args.bam1)?,
            sample2: BamPileupSource::open(&args.bam2)?,
            reference: FastaSequenceSource::open(&args.ref_fasta)?,
        })
    }

    /// Contigs missing from either BAM header are skipped; the reference is
    /// checked when the chromosome is loaded.
    pub fn missing_contig(&self, contig: &str) -> Option<AppError> {
        [&self.sample1, &self.sample2]
            .into_iter()
            .find(|source| !source.has_contig(contig))
            .map(|source| AppError::UnknownChromosome {
                chromosome: contig.to_string(),
                source_name: format!("BAM header of {}", source.path()),
            })
    }
}
