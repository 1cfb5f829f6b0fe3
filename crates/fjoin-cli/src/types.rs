use std::path::PathBuf;

use fjoin_model::{JoinResult, ResolvedMatch};
use serde::Serialize;

/// Result of `fjoin join`.
#[derive(Debug)]
pub struct JoinOutcome {
    pub left_rows: usize,
    pub right_rows: usize,
    pub result: JoinResult,
    pub output: Option<PathBuf>,
}

/// Result of `fjoin preview` for one level.
#[derive(Debug)]
pub struct PreviewOutcome {
    pub level: usize,
    pub left_column: String,
    pub right_column: String,
    pub resolved: ResolvedMatch,
}

/// One mapping row as printed and serialized by the preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    /// Block values joined with `/`, empty without exact keys.
    pub block: String,
    pub left: String,
    pub right: String,
    /// Primary difference followed by tie-break differences.
    pub diff: String,
    pub match_type: String,
    /// True when the left value has more than one top-1 partner.
    pub tied: bool,
}

impl PreviewOutcome {
    pub fn rows(&self) -> Vec<PreviewRow> {
        self.resolved
            .groups
            .iter()
            .flat_map(|group| {
                let block = group
                    .block
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("/");
                let tied = group.has_duplicates();
                group.matches.iter().map(move |scored| PreviewRow {
                    block: block.clone(),
                    left: scored.left().to_string(),
                    right: scored.right().to_string(),
                    diff: format_diffs(&scored.diffs),
                    match_type: scored.match_type().to_string(),
                    tied,
                })
            })
            .collect()
    }
}

fn format_diffs(diffs: &[f64]) -> String {
    diffs
        .iter()
        .map(|d| {
            if d.fract() == 0.0 {
                format!("{d:.0}")
            } else {
                format!("{d:.4}")
            }
        })
        .collect::<Vec<_>>()
        .join(" / ")
}
