//! Resolved top-1 matches and join results.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::candidate::{BlockKey, MatchType, ScoredCandidate};
use crate::value::KeyValue;

/// All minimal-scoring right values for one (block, left value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchGroup {
    pub block: BlockKey,
    pub left: KeyValue,
    /// Tied winners, ordered by right value.
    pub matches: Vec<ScoredCandidate>,
}

impl MatchGroup {
    /// True when more than one right value is tied for the minimum.
    pub fn has_duplicates(&self) -> bool {
        self.matches.len() > 1
    }

    pub fn is_exact(&self) -> bool {
        self.matches
            .iter()
            .any(|m| m.match_type() == MatchType::Exact)
    }

    pub fn rights(&self) -> impl Iterator<Item = &KeyValue> {
        self.matches.iter().map(ScoredCandidate::right)
    }
}

/// Top-1 resolution of one fuzzy level.
///
/// Groups are ordered by (block, left value). Left values with no surviving
/// candidate have no group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    pub groups: Vec<MatchGroup>,
}

impl ResolvedMatch {
    pub fn new(mut groups: Vec<MatchGroup>) -> Self {
        groups.sort_by(|a, b| (&a.block, &a.left).cmp(&(&b.block, &b.left)));
        Self { groups }
    }

    /// True iff some group holds more than one row.
    pub fn has_duplicates(&self) -> bool {
        self.groups.iter().any(MatchGroup::has_duplicates)
    }

    pub fn duplicate_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.has_duplicates()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of (left, right) rows across all groups.
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.groups.iter().flat_map(|g| g.matches.iter())
    }

    pub fn into_candidates(self) -> Vec<ScoredCandidate> {
        self.groups.into_iter().flat_map(|g| g.matches).collect()
    }

    pub fn group(&self, block: &[KeyValue], left: &KeyValue) -> Option<&MatchGroup> {
        self.groups
            .iter()
            .find(|g| g.block.as_slice() == block && &g.left == left)
    }

    /// Counts describing this resolution.
    pub fn summarize(&self, level: usize, left: &str, right: &str) -> LevelSummary {
        let exact = self.groups.iter().filter(|g| g.is_exact()).count();
        LevelSummary {
            level,
            left_column: left.to_string(),
            right_column: right.to_string(),
            groups: self.groups.len(),
            exact,
            approx: self.groups.len() - exact,
            rows: self.row_count(),
            duplicate_groups: self.duplicate_groups(),
        }
    }
}

/// Diagnostics for one resolved fuzzy level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: usize,
    pub left_column: String,
    pub right_column: String,
    /// Left values with at least one match.
    pub groups: usize,
    /// Groups resolved by an exact match.
    pub exact: usize,
    /// Groups resolved by an approximate match.
    pub approx: usize,
    /// Mapping rows (groups plus tied extras).
    pub rows: usize,
    /// Groups with more than one tied right value.
    pub duplicate_groups: usize,
}

impl LevelSummary {
    pub fn has_duplicates(&self) -> bool {
        self.duplicate_groups > 0
    }
}

/// Joined table plus per-level diagnostics.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub frame: DataFrame,
    pub levels: Vec<LevelSummary>,
}

impl JoinResult {
    /// True iff any level had tied matches.
    pub fn has_duplicates(&self) -> bool {
        self.levels.iter().any(LevelSummary::has_duplicates)
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;

    fn scored(left: &str, right: &str, diff: f64) -> ScoredCandidate {
        let candidate = if left == right {
            Candidate::exact(vec![], left.into())
        } else {
            Candidate::approx(vec![], left.into(), right.into())
        };
        ScoredCandidate::new(candidate, vec![diff])
    }

    #[test]
    fn test_has_duplicates_and_summary() {
        let resolved = ResolvedMatch::new(vec![
            MatchGroup {
                block: vec![],
                left: "cat".into(),
                matches: vec![scored("cat", "bat", 1.0), scored("cat", "cut", 1.0)],
            },
            MatchGroup {
                block: vec![],
                left: "dog".into(),
                matches: vec![scored("dog", "dog", 0.0)],
            },
        ]);
        assert!(resolved.has_duplicates());
        assert_eq!(resolved.row_count(), 3);

        let summary = resolved.summarize(0, "name", "name");
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.exact, 1);
        assert_eq!(summary.approx, 1);
        assert_eq!(summary.duplicate_groups, 1);
    }

    #[test]
    fn test_groups_are_sorted() {
        let resolved = ResolvedMatch::new(vec![
            MatchGroup {
                block: vec![],
                left: "z".into(),
                matches: vec![scored("z", "z", 0.0)],
            },
            MatchGroup {
                block: vec![],
                left: "a".into(),
                matches: vec![scored("a", "a", 0.0)],
            },
        ]);
        assert_eq!(resolved.groups[0].left, KeyValue::from("a"));
        assert!(resolved.group(&[], &KeyValue::from("z")).is_some());
    }
}
