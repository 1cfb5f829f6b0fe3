//! JSON join configuration.
//!
//! A configuration file declares the keys and per-level settings of a join:
//!
//! ```json
//! {
//!   "exact_keys": "region",
//!   "fuzzy_keys": ["city", "year"],
//!   "exact_how": "left",
//!   "levels": {
//!     "0": { "differences": ["levenshtein", "jaro_winkler"], "score_cutoff": 2 },
//!     "1": { "direction": "backward" }
//!   }
//! }
//! ```
//!
//! Command line flags are merged on top with [`JoinConfig::apply_overrides`].

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use fjoin_core::{FuzzyJoin, FuzzyJoinBuilder, difference_by_name};
use fjoin_model::{JoinHow, KeyDeclaration, LevelConfig, MergeDirection};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Declared keys and per-level settings of one join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    pub exact_keys: Option<KeyDeclaration>,
    pub fuzzy_keys: Option<KeyDeclaration>,
    /// Interpret key lists per dataset instead of per level.
    pub by_dataset: bool,
    pub exact_how: JoinHow,
    /// Settings keyed by zero-based fuzzy level.
    pub levels: BTreeMap<usize, LevelSettings>,
}

/// Settings of one fuzzy level, with difference functions named from the
/// built-in registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelSettings {
    pub differences: Vec<String>,
    pub score_cutoff: Option<f64>,
    pub candidate_limit: Option<usize>,
    pub direction: MergeDirection,
}

impl LevelSettings {
    /// Resolve names against the registry.
    pub fn to_level_config(&self) -> fjoin_model::Result<LevelConfig> {
        let differences = self
            .differences
            .iter()
            .map(|name| difference_by_name(name))
            .collect::<fjoin_model::Result<Vec<_>>>()?;
        Ok(LevelConfig::new()
            .with_differences(differences)
            .with_score_cutoff(self.score_cutoff)
            .with_candidate_limit(self.candidate_limit)
            .with_direction(self.direction))
    }
}

/// Level settings given on the command line. Set fields replace the file's
/// values on every fuzzy level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelOverrides {
    pub differences: Vec<String>,
    pub score_cutoff: Option<f64>,
    pub candidate_limit: Option<usize>,
    pub direction: Option<MergeDirection>,
}

impl LevelOverrides {
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
            && self.score_cutoff.is_none()
            && self.candidate_limit.is_none()
            && self.direction.is_none()
    }
}

impl JoinConfig {
    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read join config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse join config {}", path.display()))
    }

    /// Number of fuzzy levels the declaration describes.
    pub fn fuzzy_level_count(&self) -> usize {
        match &self.fuzzy_keys {
            None => 0,
            Some(KeyDeclaration::Single(_)) => 1,
            Some(KeyDeclaration::List(columns)) if self.by_dataset => columns.len().min(1),
            Some(KeyDeclaration::List(columns)) => columns.len(),
            Some(KeyDeclaration::Nested(lists)) if self.by_dataset => {
                lists.first().map_or(0, Vec::len)
            }
            Some(KeyDeclaration::Nested(lists)) => lists.len(),
        }
    }

    /// Merge command line values on top of the file.
    ///
    /// Keys given on the command line replace the file's keys and are always
    /// read per level. Replacing one key set while the file keeps the other
    /// in per-dataset form is rejected, since the two would need different
    /// readings.
    pub fn apply_overrides(
        &mut self,
        exact: Option<KeyDeclaration>,
        fuzzy: Option<KeyDeclaration>,
        how: Option<JoinHow>,
        level: &LevelOverrides,
    ) -> Result<()> {
        if self.by_dataset {
            let kept = match (&exact, &fuzzy) {
                (Some(_), None) => self.fuzzy_keys.as_ref().map(|_| "fuzzy"),
                (None, Some(_)) => self.exact_keys.as_ref().map(|_| "exact"),
                _ => None,
            };
            if let Some(kept) = kept {
                bail!(
                    "the config file declares {kept} keys per dataset; \
                     give both --exact and --fuzzy on the command line or neither"
                );
            }
        }
        if exact.is_some() || fuzzy.is_some() {
            self.by_dataset = false;
        }
        if let Some(exact) = exact {
            self.exact_keys = Some(exact);
        }
        if let Some(fuzzy) = fuzzy {
            self.fuzzy_keys = Some(fuzzy);
        }
        if let Some(how) = how {
            self.exact_how = how;
        }
        if level.is_empty() {
            return Ok(());
        }
        for index in 0..self.fuzzy_level_count() {
            let settings = self.levels.entry(index).or_default();
            if !level.differences.is_empty() {
                settings.differences = level.differences.clone();
            }
            if level.score_cutoff.is_some() {
                settings.score_cutoff = level.score_cutoff;
            }
            if level.candidate_limit.is_some() {
                settings.candidate_limit = level.candidate_limit;
            }
            if let Some(direction) = level.direction {
                settings.direction = direction;
            }
        }
        Ok(())
    }

    /// Prepare a join builder for two datasets.
    pub fn builder(&self, left: DataFrame, right: DataFrame) -> fjoin_model::Result<FuzzyJoinBuilder> {
        let mut builder = FuzzyJoin::builder(vec![left, right])
            .exact_how(self.exact_how)
            .by_dataset(self.by_dataset);
        if let Some(keys) = &self.exact_keys {
            builder = builder.exact_keys(keys.clone());
        }
        if let Some(keys) = &self.fuzzy_keys {
            builder = builder.fuzzy_keys(keys.clone());
        }
        for (&index, settings) in &self.levels {
            builder = builder.level(index, settings.to_level_config()?);
        }
        Ok(builder)
    }
}

/// Parse repeated `--exact`/`--fuzzy` values.
///
/// `COL` names a column shared by both files; `LEFT:RIGHT` names a pair.
pub fn parse_key_args(values: &[String]) -> Option<KeyDeclaration> {
    if values.is_empty() {
        return None;
    }
    if !values.iter().any(|v| v.contains(':')) {
        return Some(KeyDeclaration::List(values.to_vec()));
    }
    let pairs = values
        .iter()
        .map(|value| match value.split_once(':') {
            Some((left, right)) => vec![left.trim().to_string(), right.trim().to_string()],
            None => vec![value.clone()],
        })
        .collect();
    Some(KeyDeclaration::Nested(pairs))
}
