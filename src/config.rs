/// Engine configuration

use std::fmt;
use std::str::FromStr;

use crate::error::LikelihoodError;

/// How node labels in an edge list are numbered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexBase {
    /// Labels start at 0.
    Zero,
    /// Labels start at 1 (R / ape convention).
    #[default]
    One,
}

impl IndexBase {
    /// Convert a raw label to an arena index.
    ///
    /// Returns `None` for labels below the base, e.g. `0` under `One`.
    #[inline]
    pub fn to_index(self, label: usize) -> Option<usize> {
        match self {
            IndexBase::Zero => Some(label),
            IndexBase::One => label.checked_sub(1),
        }
    }
}

impl FromStr for IndexBase {
    type Err = LikelihoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(IndexBase::Zero),
            "one" | "1" => Ok(IndexBase::One),
            other => Err(LikelihoodError::InvalidConfig(format!(
                "unknown index base '{}', expected 'zero' or 'one'",
                other
            ))),
        }
    }
}

impl fmt::Display for IndexBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexBase::Zero => write!(f, "zero"),
            IndexBase::One => write!(f, "one"),
        }
    }
}

/// Options for a single engine invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Numbering used by the caller's edge list.
    pub index_base: IndexBase,
}

impl EngineConfig {
    pub fn new(index_base: IndexBase) -> Self {
        Self { index_base }
    }

    pub fn zero_based() -> Self {
        Self::new(IndexBase::Zero)
    }

    pub fn one_based() -> Self {
        Self::new(IndexBase::One)
    }
}
