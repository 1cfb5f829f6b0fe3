//! Top-1 selection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use fjoin_model::{BlockKey, KeyValue, MatchGroup, ResolvedMatch, ScoredCandidate};
use tracing::warn;

type Groups = BTreeMap<(BlockKey, KeyValue), Vec<ScoredCandidate>>;

/// Keep, per (block, left value), every candidate whose score chain equals
/// the group minimum.
///
/// Ties are all kept and reported through [`ResolvedMatch::has_duplicates`].
/// Running the selector on its own output returns the same resolution.
pub fn select_top1(scored: Vec<ScoredCandidate>) -> ResolvedMatch {
    let groups = group_minimum(scored)
        .into_iter()
        .map(|((block, left), mut matches)| {
            matches.sort_by(|a, b| a.right().cmp(b.right()));
            matches.dedup_by(|a, b| a.right() == b.right());
            MatchGroup {
                block,
                left,
                matches,
            }
        })
        .collect();
    let resolved = ResolvedMatch::new(groups);
    if resolved.has_duplicates() {
        warn!(
            duplicate_groups = resolved.duplicate_groups(),
            "top-1 match has duplicates; tied rows are kept"
        );
    }
    resolved
}

/// Minimum-scoring candidates of every group, flattened.
pub(crate) fn retain_group_minimum(scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    group_minimum(scored).into_values().flatten().collect()
}

fn group_minimum(scored: Vec<ScoredCandidate>) -> Groups {
    let mut groups = Groups::new();
    for item in scored {
        let group = groups
            .entry((item.block().clone(), item.left().clone()))
            .or_default();
        match group.first().map(|best| item.cmp_scores(best)) {
            None | Some(Ordering::Equal) => group.push(item),
            Some(Ordering::Less) => {
                group.clear();
                group.push(item);
            }
            Some(Ordering::Greater) => {}
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjoin_model::Candidate;

    fn scored(left: &str, right: &str, diffs: Vec<f64>) -> ScoredCandidate {
        ScoredCandidate::new(Candidate::approx(vec![], left.into(), right.into()), diffs)
    }

    #[test]
    fn test_keeps_minimum_per_left() {
        let resolved = select_top1(vec![
            scored("cat", "dog", vec![3.0]),
            scored("cat", "bat", vec![1.0]),
            scored("cow", "dog", vec![2.0]),
        ]);
        assert_eq!(resolved.groups.len(), 2);
        let cat = resolved.group(&[], &"cat".into()).unwrap();
        assert_eq!(cat.rights().collect::<Vec<_>>(), vec![&KeyValue::from("bat")]);
        assert!(!resolved.has_duplicates());
    }

    #[test]
    fn test_ties_are_kept_and_flagged() {
        let resolved = select_top1(vec![
            scored("cat", "cut", vec![1.0]),
            scored("cat", "bat", vec![1.0]),
            scored("cat", "cats", vec![1.0]),
            scored("cat", "dog", vec![3.0]),
        ]);
        let cat = resolved.group(&[], &"cat".into()).unwrap();
        let rights: Vec<_> = cat.rights().cloned().collect();
        assert_eq!(
            rights,
            vec![
                KeyValue::from("bat"),
                KeyValue::from("cats"),
                KeyValue::from("cut")
            ]
        );
        assert!(resolved.has_duplicates());
    }

    #[test]
    fn test_tie_break_scores_decide() {
        let resolved = select_top1(vec![
            scored("cat", "bat", vec![1.0, 5.0]),
            scored("cat", "cut", vec![1.0, 2.0]),
        ]);
        let cat = resolved.group(&[], &"cat".into()).unwrap();
        assert_eq!(cat.matches.len(), 1);
        assert_eq!(cat.matches[0].right(), &KeyValue::from("cut"));
    }

    #[test]
    fn test_idempotent() {
        let once = select_top1(vec![
            scored("a", "x", vec![1.0]),
            scored("a", "y", vec![1.0]),
            scored("b", "y", vec![0.5]),
        ]);
        let twice = select_top1(once.clone().into_candidates());
        assert_eq!(once, twice);
    }
}
