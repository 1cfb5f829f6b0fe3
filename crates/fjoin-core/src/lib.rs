//! Top-1 fuzzy join engine.
//!
//! - **keys**: key declaration resolution
//! - **candidates**: blocked candidate generation
//! - **score** / **difference**: difference functions and tie-break scoring
//! - **top1**: minimum-per-group selection
//! - **numeric**: sorted-merge resolution for ordered keys
//! - **assemble**: mapping tables and joined output
//! - **orchestrator**: multi-level joins and the one-shot [`merge_top1`]

pub mod assemble;
pub mod candidates;
pub mod difference;
pub mod frame;
pub mod keys;
pub mod numeric;
pub mod orchestrator;
pub mod score;
pub mod top1;

pub use assemble::{RIGHT_SUFFIX, assemble_join};
pub use candidates::compute_candidates;
pub use difference::{REGISTERED, default_difference, difference_by_name};
pub use keys::resolve_keys;
pub use numeric::resolve_sorted;
pub use orchestrator::{FuzzyJoin, FuzzyJoinBuilder, Top1Merge, merge_top1};
pub use score::score_candidates;
pub use top1::select_top1;
