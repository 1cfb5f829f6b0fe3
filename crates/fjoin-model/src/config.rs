//! Join modes and per-level fuzzy configuration.
//!
//! [`LevelConfig`] is an immutable value: every `with_*` method returns a new
//! configuration, so a level is never observed half-updated.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::JoinError;
use crate::value::KeyValue;

/// Signature of a difference function: lower means more similar, never negative.
pub type DifferenceFn = dyn Fn(&KeyValue, &KeyValue) -> f64 + Send + Sync;

/// A named difference function.
///
/// Functions must be pure and deterministic; the engine may call them more
/// than once for the same pair.
#[derive(Clone)]
pub struct Difference {
    name: String,
    func: Arc<DifferenceFn>,
}

impl Difference {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&KeyValue, &KeyValue) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn eval(&self, left: &KeyValue, right: &KeyValue) -> f64 {
        (self.func)(left, right)
    }
}

impl fmt::Debug for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Difference").field(&self.name).finish()
    }
}

/// Direction of the sorted-merge nearest neighbour search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDirection {
    /// Closest right value on either side.
    #[default]
    Nearest,
    /// Smallest right value >= left.
    Forward,
    /// Largest right value <= left.
    Backward,
}

impl FromStr for MergeDirection {
    type Err = JoinError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(MergeDirection::Nearest),
            "forward" => Ok(MergeDirection::Forward),
            "backward" => Ok(MergeDirection::Backward),
            other => Err(JoinError::config(format!(
                "invalid merge direction '{other}', expected nearest, forward or backward"
            ))),
        }
    }
}

/// Join type applied to the exact keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinHow {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinHow::Inner => "inner",
            JoinHow::Left => "left",
            JoinHow::Right => "right",
            JoinHow::Outer => "outer",
        }
    }
}

impl FromStr for JoinHow {
    type Err = JoinError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinHow::Inner),
            "left" => Ok(JoinHow::Left),
            "right" => Ok(JoinHow::Right),
            "outer" => Ok(JoinHow::Outer),
            other => Err(JoinError::config(format!(
                "invalid how parameter '{other}', expected inner, left, right or outer"
            ))),
        }
    }
}

impl fmt::Display for JoinHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side's values look for a top-1 partner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzyHow {
    /// Every left value looks for its nearest right value.
    #[default]
    Left,
    Right,
    Inner,
}

/// Configuration of one fuzzy level.
#[derive(Debug, Clone, Default)]
pub struct LevelConfig {
    differences: Vec<Difference>,
    score_cutoff: Option<f64>,
    candidate_limit: Option<usize>,
    direction: MergeDirection,
    fuzzy_how: FuzzyHow,
}

impl LevelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie-break chain of difference functions. Empty means "use the default
    /// for the key's column kind".
    pub fn differences(&self) -> &[Difference] {
        &self.differences
    }

    pub fn score_cutoff(&self) -> Option<f64> {
        self.score_cutoff
    }

    pub fn candidate_limit(&self) -> Option<usize> {
        self.candidate_limit
    }

    pub fn direction(&self) -> MergeDirection {
        self.direction
    }

    pub fn fuzzy_how(&self) -> FuzzyHow {
        self.fuzzy_how
    }

    pub fn has_explicit_differences(&self) -> bool {
        !self.differences.is_empty()
    }

    #[must_use]
    pub fn with_differences(self, differences: Vec<Difference>) -> Self {
        Self {
            differences,
            ..self
        }
    }

    #[must_use]
    pub fn with_difference(self, difference: Difference) -> Self {
        self.with_differences(vec![difference])
    }

    #[must_use]
    pub fn with_score_cutoff(self, score_cutoff: Option<f64>) -> Self {
        Self {
            score_cutoff,
            ..self
        }
    }

    #[must_use]
    pub fn with_candidate_limit(self, candidate_limit: Option<usize>) -> Self {
        Self {
            candidate_limit,
            ..self
        }
    }

    #[must_use]
    pub fn with_direction(self, direction: MergeDirection) -> Self {
        Self { direction, ..self }
    }

    #[must_use]
    pub fn with_fuzzy_how(self, fuzzy_how: FuzzyHow) -> Self {
        Self { fuzzy_how, ..self }
    }
}
