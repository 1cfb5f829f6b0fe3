//! Candidate pairs produced before and after scoring.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::KeyValue;

/// Exact-key values identifying a block. Empty for the single global block.
pub type BlockKey = Vec<KeyValue>;

/// How a candidate pair was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Left and right values are equal.
    Exact,
    /// Left value has no equal on the right; the pair is scored.
    Approx,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Approx => "approx",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (left, right) pair considered for top-1 selection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Candidate {
    pub block: BlockKey,
    pub left: KeyValue,
    pub right: KeyValue,
    pub match_type: MatchType,
}

impl Candidate {
    pub fn exact(block: BlockKey, value: KeyValue) -> Self {
        Self {
            block,
            right: value.clone(),
            left: value,
            match_type: MatchType::Exact,
        }
    }

    pub fn approx(block: BlockKey, left: KeyValue, right: KeyValue) -> Self {
        Self {
            block,
            left,
            right,
            match_type: MatchType::Approx,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.match_type == MatchType::Exact
    }
}

/// A candidate with one score per applied difference function.
///
/// `diffs[0]` is the primary score; later entries are tie-break scores and
/// are only present for candidates that survived the earlier passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub diffs: Vec<f64>,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, diffs: Vec<f64>) -> Self {
        Self { candidate, diffs }
    }

    /// Primary difference score.
    pub fn diff(&self) -> f64 {
        self.diffs.first().copied().unwrap_or(0.0)
    }

    pub fn block(&self) -> &BlockKey {
        &self.candidate.block
    }

    pub fn left(&self) -> &KeyValue {
        &self.candidate.left
    }

    pub fn right(&self) -> &KeyValue {
        &self.candidate.right
    }

    pub fn match_type(&self) -> MatchType {
        self.candidate.match_type
    }

    /// Lexicographic comparison over the score chain.
    pub fn cmp_scores(&self, other: &Self) -> Ordering {
        for (a, b) in self.diffs.iter().zip(&other.diffs) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        self.diffs.len().cmp(&other.diffs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_candidate_mirrors_value() {
        let candidate = Candidate::exact(vec![], KeyValue::from("cat"));
        assert!(candidate.is_exact());
        assert_eq!(candidate.left, candidate.right);
    }

    #[test]
    fn test_cmp_scores_is_lexicographic() {
        let candidate = Candidate::approx(vec![], "a".into(), "b".into());
        let a = ScoredCandidate::new(candidate.clone(), vec![1.0, 3.0]);
        let b = ScoredCandidate::new(candidate, vec![1.0, 2.0]);
        assert_eq!(a.cmp_scores(&b), Ordering::Greater);
        assert_eq!(a.cmp_scores(&a), Ordering::Equal);
    }
}
