//! Candidate generation.
//!
//! For one fuzzy key and optional exact block keys, every distinct left value
//! either matches an equal right value in its block (one exact candidate) or
//! is paired with every distinct right value of its block (approx
//! candidates). Blocks present on only one side contribute nothing.

use fjoin_model::{Candidate, KeyBinding, Result};
use polars::prelude::DataFrame;
use tracing::debug;

use crate::frame::{KeyIndex, Side, distinct_keys};

/// Build candidate pairs for one fuzzy level.
///
/// `limit` restricts the number of distinct left values considered per
/// block, in ascending value order.
pub fn compute_candidates(
    left: &DataFrame,
    right: &DataFrame,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
    limit: Option<usize>,
) -> Result<Vec<Candidate>> {
    let left_index = distinct_keys(left, Side::Left, fuzzy, blocks)?;
    let right_index = distinct_keys(right, Side::Right, fuzzy, blocks)?;
    let candidates = candidates_from_index(&left_index, &right_index, limit);
    debug!(
        left = %fuzzy.left,
        right = %fuzzy.right,
        blocks = left_index.len(),
        candidates = candidates.len(),
        exact = candidates.iter().filter(|c| c.is_exact()).count(),
        "generated candidates"
    );
    Ok(candidates)
}

/// Candidates for two prebuilt indexes, sorted by (block, left, right).
pub fn candidates_from_index(
    left: &KeyIndex,
    right: &KeyIndex,
    limit: Option<usize>,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (block, left_values) in left {
        let Some(right_values) = right.get(block) else {
            continue;
        };
        for left_value in left_values.iter().take(limit.unwrap_or(usize::MAX)) {
            if right_values.contains(left_value) {
                candidates.push(Candidate::exact(block.clone(), left_value.clone()));
                continue;
            }
            candidates.extend(right_values.iter().map(|right_value| {
                Candidate::approx(block.clone(), left_value.clone(), right_value.clone())
            }));
        }
    }
    candidates
}
