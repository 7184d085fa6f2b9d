//! Sequence-context classes for covered reference bases.
//!
//! A class is either a pair of acceptable bases (`AT`, `CG`) or a dinucleotide
//! motif written `XpY` (`CpG`, `TpC`). Classes are checked in the order they were
//! configured and the first match wins. A base that matches nothing falls into
//! the reserved IUB bucket.

use crate::errors::{AppError, Result};
use std::fmt;

pub const DEFAULT_CLASS_TYPES: &str = "AT,CG,CpG";

/// The cache stores classes in one byte and reserves two values (IUB, unknown).
pub const MAX_CLASS_PATTERNS: usize = (u8::MAX - 1) as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    /// Either base at the center position.
    Pair { first: u8, second: u8 },
    /// `left` followed by `right`, read from either side of the dinucleotide.
    Dinucleotide { left: u8, right: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPattern {
    label: String,
    kind: PatternKind,
}

impl ClassPattern {
    pub fn parse(token: &str) -> Result<Self> {
        let bases = token.as_bytes();
        let kind = match bases {
            [first, second] => PatternKind::Pair {
                first: first.to_ascii_uppercase(),
                second: second.to_ascii_uppercase(),
            },
            [left, _, right] => PatternKind::Dinucleotide {
                left: left.to_ascii_uppercase(),
                right: right.to_ascii_uppercase(),
            },
            _ => {
                return Err(AppError::InvalidValue {
                    flag: "-c".to_string(),
                    value: token.to_string(),
                    reason: "bp class types must be 2 (e.g. AT) or 3 (e.g. CpG) characters long"
                        .to_string(),
                });
            }
        };

        Ok(Self {
            label: token.to_string(),
            kind,
        })
    }

    /// The pattern as the user spelled it; used for report column names.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Expects upper-cased bases.
    pub fn matches(&self, prev: u8, center: u8, next: u8) -> bool {
        match self.kind {
            PatternKind::Pair { first, second } => center == first || center == second,
            PatternKind::Dinucleotide { left, right } => {
                (center == left && next == right) || (center == right && prev == left)
            }
        }
    }
}

/// Class assigned to a covered base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BpClass {
    /// Index into the configured pattern list.
    Pattern(u8),
    Iub,
}

impl fmt::Display for BpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(index) => write!(f, "class#{index}"),
            Self::Iub => f.write_str("IUB"),
        }
    }
}

/// Ordered, non-empty list of class patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    patterns: Vec<ClassPattern>,
}

impl ClassSpec {
    pub fn parse(types: &str) -> Result<Self> {
        let patterns = types
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(ClassPattern::parse)
            .collect::<Result<Vec<_>>>()?;

        if patterns.is_empty() {
            return Err(AppError::InvalidValue {
                flag: "-c".to_string(),
                value: types.to_string(),
                reason: "at least one bp class type is required".to_string(),
            });
        }
        if patterns.len() > MAX_CLASS_PATTERNS {
            return Err(AppError::InvalidValue {
                flag: "-c".to_string(),
                value: types.to_string(),
                reason: format!("at most {MAX_CLASS_PATTERNS} bp class types are supported"),
            });
        }

        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[ClassPattern] {
        &self.patterns
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(ClassPattern::label)
    }

    /// Returns the first matching pattern, or `None` when the base belongs to no
    /// configured class. Bases may be given in any case.
    pub fn classify(&self, prev: u8, center: u8, next: u8) -> Option<u8> {
        let prev = prev.to_ascii_uppercase();
        let center = center.to_ascii_uppercase();
        let next = next.to_ascii_uppercase();

        self.patterns
            .iter()
            .position(|pattern| pattern.matches(prev, center, next))
            .map(|index| index as u8)
    }

    /// Like [`ClassSpec::classify`] but total: unmatched bases are IUB.
    pub fn class_of(&self, prev: u8, center: u8, next: u8) -> BpClass {
        self.classify(prev, center, next)
            .map_or(BpClass::Iub, BpClass::Pattern)
    }
}

impl Default for ClassSpec {
    fn default() -> Self {
        Self {
            patterns: vec![
                ClassPattern {
                    label: "AT".to_string(),
                    kind: PatternKind::Pair {
                        first: b'A',
                        second: b'T',
                    },
                },
                ClassPattern {
                    label: "CG".to_string(),
                    kind: PatternKind::Pair {
                        first: b'C',
                        second: b'G',
                    },
                },
                ClassPattern {
                    label: "CpG".to_string(),
                    kind: PatternKind::Dinucleotide {
                        left: b'C',
                        right: b'G',
                    },
                },
            ],
        }
    }
}
