//! Per-chromosome memory of which reference positions were already counted.
//!
//! Overlapping ROIs on the same chromosome revisit the same positions. The
//! first ROI to count a position classifies it and records the class here;
//! later ROIs reuse the recorded class and leave the genome-wide totals alone.

use crate::bp_class::BpClass;
use crate::errors::{AppError, Result};
use crate::sources::SequenceSource;
use tracing::debug;

const UNKNOWN: u8 = u8::MAX;
const IUB: u8 = u8::MAX - 1;

fn encode(class: BpClass) -> u8 {
    match class {
        BpClass::Pattern(index) => index,
        BpClass::Iub => IUB,
    }
}

fn decode(value: u8) -> Option<BpClass> {
    match value {
        UNKNOWN => None,
        IUB => Some(BpClass::Iub),
        index => Some(BpClass::Pattern(index)),
    }
}

/// Reference bases of one chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWindow {
    bases: Vec<u8>,
}

impl ReferenceWindow {
    pub fn new(bases: Vec<u8>) -> Self {
        Self { bases }
    }

    pub fn len(&self) -> u64 {
        self.bases.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// `(pos - 1, pos, pos + 1)`; missing neighbors read as `N`.
    pub fn neighborhood(&self, position: u64) -> (u8, u8, u8) {
        let at = |pos: Option<u64>| {
            pos.and_then(|pos| usize::try_from(pos).ok())
                .and_then(|pos| self.bases.get(pos).copied())
                .unwrap_or(b'N')
        };
        (
            at(position.checked_sub(1)),
            at(Some(position)),
            at(position.checked_add(1)),
        )
    }
}

#[derive(Debug)]
struct LoadedChromosome {
    name: String,
    window: ReferenceWindow,
    classes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ChromosomeClassCache {
    active: Option<LoadedChromosome>,
    loads: usize,
}

impl ChromosomeClassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `chromosome` the active one, loading its sequence if it is not
    /// already active. On failure the previously active chromosome is kept.
    pub fn ensure<S>(&mut self, chromosome: &str, sequences: &mut S) -> Result<()>
    where
        S: SequenceSource + ?Sized,
    {
        if self.active_chromosome() == Some(chromosome) {
            return Ok(());
        }

        let bases = sequences.fetch_sequence(chromosome)?;
        debug!(chromosome, length = bases.len(), "loaded reference chromosome");
        self.active = Some(LoadedChromosome {
            name: chromosome.to_string(),
            classes: vec![UNKNOWN; bases.len()],
            window: ReferenceWindow::new(bases),
        });
        self.loads += 1;
        Ok(())
    }

    pub fn active_chromosome(&self) -> Option<&str> {
        self.active.as_ref().map(|loaded| loaded.name.as_str())
    }

    /// Number of chromosome loads so far.
    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn window(&self) -> Result<&ReferenceWindow> {
        Ok(&self.loaded()?.window)
    }

    /// `None` while the position has not been classified.
    pub fn get(&self, position: u64) -> Result<Option<BpClass>> {
        let loaded = self.loaded()?;
        let value = slot(&loaded.classes, position)
            .copied()
            .ok_or_else(|| out_of_range(&loaded.name, position))?;
        Ok(decode(value))
    }

    pub fn set(&mut self, position: u64, class: BpClass) -> Result<()> {
        let loaded = self.active.as_mut().ok_or_else(no_active_chromosome)?;
        let name = &loaded.name;
        let value = slot_mut(&mut loaded.classes, position)
            .ok_or_else(|| out_of_range(name, position))?;

        let encoded = encode(class);
        if *value != UNKNOWN && *value != encoded {
            return Err(AppError::Internal {
                message: format!(
                    "position {name}:{} already classified as {}, refusing {class}",
                    position + 1,
                    decode(*value).map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                ),
            });
        }
        *value = encoded;
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedChromosome> {
        self.active.as_ref().ok_or_else(no_active_chromosome)
    }
}

fn slot(classes: &[u8], position: u64) -> Option<&u8> {
    usize::try_from(position).ok().and_then(|pos| classes.get(pos))
}

fn slot_mut(classes: &mut [u8], position: u64) -> Option<&mut u8> {
    usize::try_from(position)
        .ok()
        .and_then(|pos| classes.get_mut(pos))
}

fn no_active_chromosome() -> AppError {
    AppError::Internal {
        message: "class cache used before a chromosome was loaded".to_string(),
    }
}

fn out_of_range(chromosome: &str, position: u64) -> AppError {
    AppError::Internal {
        message: format!("position {chromosome}:{} outside the loaded reference", position + 1),
    }
}
