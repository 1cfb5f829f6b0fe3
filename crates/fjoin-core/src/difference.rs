//! Built-in difference functions and the per-kind default table.
//!
//! Text distances come from rapidfuzz. Every function returns a
//! non-negative score where lower means more similar.

use std::borrow::Cow;

use fjoin_model::{ColumnKind, Difference, JoinError, KeyValue, Result};
use rapidfuzz::distance::{jaro_winkler, levenshtein};

pub const ABS_DIFF: &str = "abs_diff";
pub const LEVENSHTEIN: &str = "levenshtein";
pub const JARO_WINKLER: &str = "jaro_winkler";
pub const PREFIX: &str = "prefix";

/// Registered names with a one-line description each.
pub const REGISTERED: &[(&str, &str)] = &[
    (ABS_DIFF, "absolute numeric difference (dates in days)"),
    (LEVENSHTEIN, "Levenshtein edit distance"),
    (JARO_WINKLER, "1 - Jaro-Winkler similarity"),
    (PREFIX, "characters outside the longest common prefix"),
];

/// Default difference per column kind. Kinds without an entry have no default.
const DEFAULTS: &[(ColumnKind, &str)] = &[
    (ColumnKind::Numeric, ABS_DIFF),
    (ColumnKind::Temporal, ABS_DIFF),
    (ColumnKind::Text, LEVENSHTEIN),
];

/// Look up a built-in difference function by name (case-insensitive).
pub fn difference_by_name(name: &str) -> Result<Difference> {
    match name.trim().to_ascii_lowercase().as_str() {
        ABS_DIFF => Ok(abs_diff()),
        LEVENSHTEIN => Ok(levenshtein_distance()),
        JARO_WINKLER => Ok(jaro_winkler_distance()),
        PREFIX => Ok(prefix_distance()),
        other => Err(JoinError::config(format!(
            "unknown difference function '{other}'"
        ))),
    }
}

/// Default difference for a column kind, if the kind has one.
pub fn default_difference(kind: ColumnKind) -> Option<Difference> {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == kind)
        .and_then(|(_, name)| difference_by_name(name).ok())
}

/// `|a - b|` over the numeric representation. Incomparable values are
/// infinitely far apart.
pub fn abs_diff() -> Difference {
    Difference::new(ABS_DIFF, |a, b| match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs(),
        _ => f64::INFINITY,
    })
}

pub fn levenshtein_distance() -> Difference {
    Difference::new(LEVENSHTEIN, |a, b| {
        levenshtein::distance(text(a).chars(), text(b).chars()) as f64
    })
}

pub fn jaro_winkler_distance() -> Difference {
    Difference::new(JARO_WINKLER, |a, b| {
        (1.0 - jaro_winkler::similarity(text(a).chars(), text(b).chars())).max(0.0)
    })
}

pub fn prefix_distance() -> Difference {
    Difference::new(PREFIX, |a, b| {
        let (a, b) = (text(a), text(b));
        let common = a
            .chars()
            .zip(b.chars())
            .take_while(|(x, y)| x == y)
            .count();
        (a.chars().count().max(b.chars().count()) - common) as f64
    })
}

fn text(value: &KeyValue) -> Cow<'_, str> {
    match value.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(value.to_string()),
    }
}
