/// One read overlapping a pileup position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadObservation {
    pub mapping_quality: u8,
    /// The read spans this position with a deletion (or reference skip).
    pub is_deletion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PileupColumn {
    /// 0-based reference position.
    pub position: u64,
    pub reads: Vec<ReadObservation>,
}

impl PileupColumn {
    pub fn new(position: u64, reads: Vec<ReadObservation>) -> Self {
        Self { position, reads }
    }

    /// Uniform column of `depth` aligned reads with the same mapping quality.
    pub fn uniform(position: u64, depth: usize, mapping_quality: u8) -> Self {
        Self {
            position,
            reads: vec![
                ReadObservation {
                    mapping_quality,
                    is_deletion: false,
                };
                depth
            ],
        }
    }
}

/// Depth threshold applied to a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthGate {
    pub min_mapq: u8,
    pub min_depth: u32,
}

impl DepthGate {
    pub fn new(min_mapq: u8, min_depth: u32) -> Self {
        Self {
            min_mapq,
            min_depth,
        }
    }

    /// Reads that carry a base here and pass the mapping-quality filter.
    pub fn filtered_depth(&self, column: &PileupColumn) -> u32 {
        let depth = column
            .reads
            .iter()
            .filter(|read| !read.is_deletion && read.mapping_quality >= self.min_mapq)
            .count();
        u32::try_from(depth).unwrap_or(u32::MAX)
    }

    pub fn passes(&self, column: &PileupColumn) -> bool {
        self.filtered_depth(column) >= self.min_depth
    }
}
