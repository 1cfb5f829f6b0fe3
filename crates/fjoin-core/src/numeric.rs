//! Sorted-merge top-1 for ordered keys.
//!
//! Numeric and temporal keys without an explicit difference function skip
//! the candidate cross product: both sides are sorted per block and each
//! left value is paired with its nearest right value in one forward sweep.
//! The difference is `|left - right|` in the key's own units (days for dates,
//! the column's time unit for datetimes). Integer, date and datetime keys are
//! compared as `i64`; float keys as `f64`, skipping non-finite values.

use std::cmp::Ordering;

use fjoin_model::{
    BlockKey, Candidate, JoinError, KeyBinding, KeyValue, MatchGroup, MatchType, MergeDirection,
    ResolvedMatch, Result, ScoredCandidate,
};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use crate::frame::{Side, check_comparable, distinct_keys};
use crate::score::validate_cutoff;

/// Resolve one ordered fuzzy level by a per-block sorted merge.
///
/// Left values without a right neighbour in the requested direction, or
/// whose nearest neighbour lies beyond `cutoff`, stay unmatched. Blocks
/// present on one side only are unmatched too. A nearest search with right
/// values equally far below and above keeps both and reports duplicates.
pub fn resolve_sorted(
    left: &DataFrame,
    right: &DataFrame,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
    direction: MergeDirection,
    cutoff: Option<f64>,
) -> Result<ResolvedMatch> {
    if !fuzzy.left_kind.is_ordered() || !fuzzy.right_kind.is_ordered() {
        return Err(JoinError::config(format!(
            "sorted merge needs numeric or temporal keys, got {} ({}) and {} ({})",
            fuzzy.left, fuzzy.left_kind, fuzzy.right, fuzzy.right_kind
        )));
    }
    check_comparable(left, right, fuzzy)?;
    validate_cutoff(cutoff)?;

    let left_index = distinct_keys(left, Side::Left, fuzzy, blocks)?;
    let right_index = distinct_keys(right, Side::Right, fuzzy, blocks)?;
    let integral = left_index
        .values()
        .chain(right_index.values())
        .flatten()
        .all(|value| ticks(value).is_some());

    let mut groups = Vec::new();
    for (block, left_values) in &left_index {
        let Some(right_values) = right_index.get(block) else {
            continue;
        };
        let sweep = Sweep {
            block,
            direction,
            cutoff,
        };
        if integral {
            sweep.run(
                &sorted_by(left_values, ticks),
                &sorted_by(right_values, ticks),
                |a: i64, b: i64| a.abs_diff(b),
                |d: u64| d as f64,
                &mut groups,
            );
        } else {
            sweep.run(
                &sorted_by(left_values, finite),
                &sorted_by(right_values, finite),
                |a: f64, b: f64| (a - b).abs(),
                |d: f64| d,
                &mut groups,
            );
        }
    }

    let resolved = ResolvedMatch::new(groups);
    debug!(
        left = %fuzzy.left,
        right = %fuzzy.right,
        direction = ?direction,
        integral,
        groups = resolved.groups.len(),
        "sorted merge resolved"
    );
    if resolved.has_duplicates() {
        warn!(
            duplicate_groups = resolved.duplicate_groups(),
            "nearest match is equidistant; both neighbours are kept"
        );
    }
    Ok(resolved)
}

/// Exact integer position of a key, if it has one.
fn ticks(value: &KeyValue) -> Option<i64> {
    match value {
        KeyValue::Integer(v) | KeyValue::Datetime(v) => Some(*v),
        KeyValue::Date(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn finite(value: &KeyValue) -> Option<f64> {
    value.as_f64().filter(|x| x.is_finite())
}

fn sorted_by<'a, T, I>(values: I, key: impl Fn(&KeyValue) -> Option<T>) -> Vec<(T, &'a KeyValue)>
where
    T: Copy + PartialOrd,
    I: IntoIterator<Item = &'a KeyValue>,
{
    let mut sorted: Vec<_> = values
        .into_iter()
        .filter_map(|value| key(value).map(|x| (x, value)))
        .collect();
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    sorted
}

struct Sweep<'a> {
    block: &'a BlockKey,
    direction: MergeDirection,
    cutoff: Option<f64>,
}

impl Sweep<'_> {
    /// Pair every left value with its neighbour(s) among `right`.
    ///
    /// `distance` must be exact in `D`; `score` converts it to the reported
    /// difference.
    fn run<T, D>(
        &self,
        left: &[(T, &KeyValue)],
        right: &[(T, &KeyValue)],
        distance: impl Fn(T, T) -> D,
        score: impl Fn(D) -> f64,
        groups: &mut Vec<MatchGroup>,
    ) where
        T: Copy + PartialOrd,
        D: Copy + PartialOrd + Default,
    {
        // right[..next] < x <= right[next..]
        let mut next = 0;
        for &(x, left_value) in left {
            while next < right.len() && right[next].0 < x {
                next += 1;
            }
            let below = next.checked_sub(1);
            let at_or_above = (next < right.len()).then_some(next);
            let equal = at_or_above.filter(|&i| right[i].0 == x);

            let picks: Vec<usize> = match self.direction {
                MergeDirection::Forward => at_or_above.into_iter().collect(),
                MergeDirection::Backward => equal.or(below).into_iter().collect(),
                MergeDirection::Nearest => match (below, at_or_above) {
                    (Some(b), Some(a)) => {
                        let down = distance(x, right[b].0);
                        let up = distance(right[a].0, x);
                        if up == D::default() || up < down {
                            vec![a]
                        } else if down < up {
                            vec![b]
                        } else {
                            vec![b, a]
                        }
                    }
                    (Some(b), None) => vec![b],
                    (None, Some(a)) => vec![a],
                    (None, None) => vec![],
                },
            };

            let matches: Vec<ScoredCandidate> = picks
                .into_iter()
                .map(|i| right[i])
                .filter_map(|(y, right_value)| {
                    let gap = distance(x, y);
                    let diff = score(gap);
                    if self.cutoff.is_some_and(|limit| diff > limit) {
                        return None;
                    }
                    let match_type = if gap == D::default() {
                        MatchType::Exact
                    } else {
                        MatchType::Approx
                    };
                    let candidate = Candidate {
                        block: self.block.clone(),
                        left: left_value.clone(),
                        right: right_value.clone(),
                        match_type,
                    };
                    Some(ScoredCandidate::new(candidate, vec![diff]))
                })
                .collect();

            if !matches.is_empty() {
                groups.push(MatchGroup {
                    block: self.block.clone(),
                    left: left_value.clone(),
                    matches,
                });
            }
        }
    }
}
