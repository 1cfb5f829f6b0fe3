//! Data model for top-1 fuzzy joins.
//!
//! - **value**: key values extracted from DataFrame columns and column kinds
//! - **keys**: key declarations and validated bindings
//! - **candidate**: candidate pairs before and after scoring
//! - **resolved**: top-1 resolutions and join results
//! - **config**: join modes, difference functions, per-level configuration

pub mod candidate;
pub mod config;
pub mod error;
pub mod keys;
pub mod resolved;
pub mod value;

pub use candidate::{BlockKey, Candidate, MatchType, ScoredCandidate};
pub use config::{Difference, DifferenceFn, FuzzyHow, JoinHow, LevelConfig, MergeDirection};
pub use error::{JoinError, Result};
pub use keys::{KeyBinding, KeyDeclaration, KeyRole};
pub use resolved::{JoinResult, LevelSummary, MatchGroup, ResolvedMatch};
pub use value::{ColumnKind, KeyValue, key_values_to_series};
