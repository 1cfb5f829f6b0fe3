//! Candidate scoring.
//!
//! The first difference function scores every approx candidate. Each further
//! function is a tie-breaker: it only scores candidates still tied for their
//! group minimum after the previous passes. Exact candidates score zero
//! under every function.

use fjoin_model::{Candidate, Difference, JoinError, Result, ScoredCandidate};
use tracing::debug;

use crate::top1::retain_group_minimum;

/// Score candidates with a tie-break chain of difference functions.
///
/// With a `cutoff`, candidates whose primary score exceeds it are dropped
/// before any tie-break runs.
pub fn score_candidates(
    candidates: Vec<Candidate>,
    differences: &[Difference],
    cutoff: Option<f64>,
) -> Result<Vec<ScoredCandidate>> {
    let Some((primary, tie_breaks)) = differences.split_first() else {
        return Err(JoinError::config(
            "at least one difference function is required",
        ));
    };
    validate_cutoff(cutoff)?;

    let total = candidates.len();
    let mut scored = Vec::with_capacity(total);
    for candidate in candidates {
        let diff = evaluate(primary, &candidate)?;
        if cutoff.is_some_and(|limit| diff > limit) {
            continue;
        }
        scored.push(ScoredCandidate::new(candidate, vec![diff]));
    }
    debug!(
        difference = primary.name(),
        candidates = total,
        kept = scored.len(),
        "scored candidates"
    );

    for difference in tie_breaks {
        scored = retain_group_minimum(scored);
        for item in &mut scored {
            let diff = evaluate(difference, &item.candidate)?;
            item.diffs.push(diff);
        }
        debug!(
            difference = difference.name(),
            kept = scored.len(),
            "applied tie-break"
        );
    }
    Ok(scored)
}

/// A cutoff must be a non-negative number.
pub fn validate_cutoff(cutoff: Option<f64>) -> Result<()> {
    match cutoff {
        Some(limit) if limit.is_nan() || limit < 0.0 => Err(JoinError::config(format!(
            "score cutoff must be a non-negative number, got {limit}"
        ))),
        _ => Ok(()),
    }
}

fn evaluate(difference: &Difference, candidate: &Candidate) -> Result<f64> {
    if candidate.is_exact() {
        return Ok(0.0);
    }
    let score = difference.eval(&candidate.left, &candidate.right);
    if score.is_nan() || score < 0.0 {
        return Err(JoinError::config(format!(
            "difference '{}' returned invalid score {score} for ({}, {})",
            difference.name(),
            candidate.left,
            candidate.right
        )));
    }
    Ok(score)
}
