//! Per-ROI coverage intersection of two samples.
//!
//! Sample 1 is piled up first and marks every position that reaches its depth
//! threshold. Sample 2 is then piled up over the same interval and only the
//! marked positions are checked against the second threshold. Positions that
//! pass both are counted for the ROI and, the first time they are seen on the
//! active chromosome, for the genome-wide totals as well.

use crate::bp_class::{BpClass, ClassSpec};
use crate::class_cache::ChromosomeClassCache;
use crate::depth_gate::DepthGate;
use crate::errors::Result;
use crate::roi::{Roi, RoiInterval};
use crate::sources::{PileupSource, SequenceSource};

/// Covered-base counters split by class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCounts {
    pub covered: u64,
    /// One counter per configured class, in configuration order.
    pub per_class: Vec<u64>,
    pub iub: u64,
}

impl ClassCounts {
    pub fn new(classes: usize) -> Self {
        Self {
            covered: 0,
            per_class: vec![0; classes],
            iub: 0,
        }
    }

    pub fn add(&mut self, class: BpClass) {
        self.covered += 1;
        match class {
            BpClass::Pattern(index) => self.per_class[usize::from(index)] += 1,
            BpClass::Iub => self.iub += 1,
        }
    }

    pub fn count(&self, class: BpClass) -> u64 {
        match class {
            BpClass::Pattern(index) => self.per_class[usize::from(index)],
            BpClass::Iub => self.iub,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.covered += other.covered;
        self.iub += other.iub;
        for (total, count) in self.per_class.iter_mut().zip(&other.per_class) {
            *total += count;
        }
    }
}

/// Result of one ROI. Bases shared with other ROIs are counted here too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiCoverage {
    pub roi: Roi,
    /// Evaluated interval after boundary adjustment.
    pub interval: RoiInterval,
    pub counts: ClassCounts,
}

/// Genome-wide counts; every position contributes at most once.
pub type GlobalTotals = ClassCounts;

#[derive(Debug)]
pub struct CoverageAccumulator {
    classes: ClassSpec,
    sample1_gate: DepthGate,
    sample2_gate: DepthGate,
    cache: ChromosomeClassCache,
    totals: GlobalTotals,
}

impl CoverageAccumulator {
    pub fn new(classes: ClassSpec, sample1_gate: DepthGate, sample2_gate: DepthGate) -> Self {
        let totals = GlobalTotals::new(classes.len());
        Self {
            classes,
            sample1_gate,
            sample2_gate,
            cache: ChromosomeClassCache::new(),
            totals,
        }
    }

    pub fn classes(&self) -> &ClassSpec {
        &self.classes
    }

    pub fn totals(&self) -> &GlobalTotals {
        &self.totals
    }

    pub fn into_totals(self) -> GlobalTotals {
        self.totals
    }

    pub fn cache(&self) -> &ChromosomeClassCache {
        &self.cache
    }

    pub fn process_roi<P1, P2, S>(
        &mut self,
        roi: &Roi,
        sample1: &mut P1,
        sample2: &mut P2,
        sequences: &mut S,
    ) -> Result<RoiCoverage>
    where
        P1: PileupSource + ?Sized,
        P2: PileupSource + ?Sized,
        S: SequenceSource + ?Sized,
    {
        self.cache.ensure(&roi.chromosome, sequences)?;
        let interval = roi.interval(self.cache.window()?.len())?;
        let mut counts = ClassCounts::new(self.classes.len());

        if !interval.is_empty() {
            let mask = self.sample1_mask(roi, interval, sample1)?;
            self.count_sample2(roi, interval, &mask, sample2, &mut counts)?;
        }

        Ok(RoiCoverage {
            roi: roi.clone(),
            interval,
            counts,
        })
    }

    fn sample1_mask<P>(
        &self,
        roi: &Roi,
        interval: RoiInterval,
        sample1: &mut P,
    ) -> Result<Vec<bool>>
    where
        P: PileupSource + ?Sized,
    {
        let mut mask = vec![false; interval.len() as usize];
        for column in sample1.columns(&roi.chromosome, interval.beg, interval.end)? {
            let column = column?;
            if !interval.contains(column.position) {
                continue;
            }
            mask[(column.position - interval.beg) as usize] = self.sample1_gate.passes(&column);
        }
        Ok(mask)
    }

    fn count_sample2<P>(
        &mut self,
        roi: &Roi,
        interval: RoiInterval,
        mask: &[bool],
        sample2: &mut P,
        counts: &mut ClassCounts,
    ) -> Result<()>
    where
        P: PileupSource + ?Sized,
    {
        for column in sample2.columns(&roi.chromosome, interval.beg, interval.end)? {
            let column = column?;
            if !interval.contains(column.position)
                || !mask[(column.position - interval.beg) as usize]
                || !self.sample2_gate.passes(&column)
            {
                continue;
            }
            self.count_position(column.position, counts)?;
        }
        Ok(())
    }

    fn count_position(&mut self, position: u64, counts: &mut ClassCounts) -> Result<()> {
        if let Some(class) = self.cache.get(position)? {
            counts.add(class);
            return Ok(());
        }

        let (prev, center, next) = self.cache.window()?.neighborhood(position);
        let class = self.classes.class_of(prev, center, next);
        self.cache.set(position, class)?;
        counts.add(class);
        self.totals.add(class);
        Ok(())
    }
}
