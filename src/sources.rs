//! Seams between the coverage engine and the files it reads.

use crate::depth_gate::PileupColumn;
use crate::errors::Result;

pub type Columns<'a> = Box<dyn Iterator<Item = Result<PileupColumn>> + 'a>;

/// Per-sample stream of pileup columns.
pub trait PileupSource {
    fn has_contig(&self, contig: &str) -> bool;

    /// Position-ordered columns overlapping `[beg, end)` (0-based). Columns
    /// outside the interval may be yielded; callers bounds-check.
    fn columns(&mut self, contig: &str, beg: u64, end: u64) -> Result<Columns<'_>>;
}

/// Whole-chromosome reference sequence lookup.
pub trait SequenceSource {
    fn fetch_sequence(&mut self, contig: &str) -> Result<Vec<u8>>;
}
