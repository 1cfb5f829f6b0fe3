//! Multi-level fuzzy join orchestration.
//!
//! [`FuzzyJoin`] owns two datasets, their resolved exact and fuzzy key
//! bindings, and one [`LevelConfig`] per fuzzy key. Each level is resolved
//! independently with the exact keys as blocks; the per-level mappings are
//! then attached to the left dataset and the right dataset is joined on the
//! exact keys plus every mapped fuzzy value.

use std::collections::BTreeMap;

use fjoin_model::{
    ColumnKind, Difference, FuzzyHow, JoinError, JoinHow, JoinResult, KeyBinding, KeyDeclaration,
    KeyRole, LevelConfig, MergeDirection, ResolvedMatch, Result,
};
use polars::prelude::{DataFrame, IntoLazy};
use tracing::{debug, info, info_span, warn};

use crate::assemble::{
    MappingColumns, assemble_join, attach_mapping, attach_right, exact_join, join_type,
    mapping_frame, strip_internal,
};
use crate::candidates::compute_candidates;
use crate::difference::default_difference;
use crate::frame::check_comparable;
use crate::keys::resolve_keys;
use crate::numeric::resolve_sorted;
use crate::score::{score_candidates, validate_cutoff};
use crate::top1::select_top1;

/// How one fuzzy level is resolved.
#[derive(Debug, Clone)]
enum Strategy {
    /// Candidate cross product scored by a tie-break chain.
    Scored(Vec<Difference>),
    /// Per-block sorted merge on an ordered key.
    SortedMerge(MergeDirection),
}

#[derive(Debug, Clone)]
struct LevelPlan {
    config: LevelConfig,
    strategy: Strategy,
}

/// Builder for [`FuzzyJoin`].
#[derive(Debug, Clone)]
pub struct FuzzyJoinBuilder {
    datasets: Vec<DataFrame>,
    exact: Option<KeyDeclaration>,
    fuzzy: Option<KeyDeclaration>,
    exact_how: JoinHow,
    levels: BTreeMap<usize, LevelConfig>,
    by_dataset: bool,
}

impl FuzzyJoinBuilder {
    pub fn exact_keys(mut self, keys: impl Into<KeyDeclaration>) -> Self {
        self.exact = Some(keys.into());
        self
    }

    pub fn fuzzy_keys(mut self, keys: impl Into<KeyDeclaration>) -> Self {
        self.fuzzy = Some(keys.into());
        self
    }

    /// Join type applied to the exact keys in the final merge.
    pub fn exact_how(mut self, how: JoinHow) -> Self {
        self.exact_how = how;
        self
    }

    /// Configure fuzzy level `level` (zero-based, in fuzzy key order).
    pub fn level(mut self, level: usize, config: LevelConfig) -> Self {
        self.levels.insert(level, config);
        self
    }

    /// Interpret key declarations per dataset rather than per level.
    pub fn by_dataset(mut self, by_dataset: bool) -> Self {
        self.by_dataset = by_dataset;
        self
    }

    /// Validate keys and level configurations.
    ///
    /// Fails on missing columns, on fuzzy keys whose two sides have
    /// different column kinds, and on level settings that cannot apply to
    /// their key.
    pub fn build(self) -> Result<FuzzyJoin> {
        if self.datasets.len() != 2 {
            return Err(JoinError::config(format!(
                "joins are pairwise: expected 2 datasets, got {}",
                self.datasets.len()
            )));
        }
        let exact = match declared(self.exact.as_ref()) {
            Some(keys) => resolve_keys(&self.datasets, keys, self.by_dataset)?,
            None => Vec::new(),
        };
        let fuzzy: Vec<KeyBinding> = match declared(self.fuzzy.as_ref()) {
            Some(keys) => resolve_keys(&self.datasets, keys, self.by_dataset)?
                .into_iter()
                .map(|binding| binding.with_role(KeyRole::Fuzzy))
                .collect(),
            None => Vec::new(),
        };
        if exact.is_empty() && fuzzy.is_empty() {
            return Err(JoinError::config(
                "must provide at least one of exact keys or fuzzy keys",
            ));
        }
        if let Some(binding) = fuzzy
            .iter()
            .find(|f| exact.iter().any(|e| e.left == f.left || e.right == f.right))
        {
            return Err(JoinError::config(format!(
                "column '{}' is declared as both an exact and a fuzzy key",
                binding.left
            )));
        }
        if let Some(&level) = self.levels.keys().find(|&&level| level >= fuzzy.len()) {
            return Err(JoinError::config(format!(
                "level {level} is configured but only {} fuzzy keys are declared",
                fuzzy.len()
            )));
        }

        let mut levels = self.levels;
        let plans = fuzzy
            .iter()
            .enumerate()
            .map(|(level, binding)| {
                plan_level(
                    &self.datasets[0],
                    &self.datasets[1],
                    binding,
                    levels.remove(&level).unwrap_or_default(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let [left, right]: [DataFrame; 2] = self
            .datasets
            .try_into()
            .map_err(|_| JoinError::config("joins are pairwise: expected 2 datasets"))?;

        info!(
            exact = exact.len(),
            fuzzy = fuzzy.len(),
            how = %self.exact_how,
            "fuzzy join configured"
        );
        Ok(FuzzyJoin {
            left,
            right,
            exact,
            fuzzy,
            exact_how: self.exact_how,
            plans,
            cache: BTreeMap::new(),
        })
    }
}

fn declared(keys: Option<&KeyDeclaration>) -> Option<&KeyDeclaration> {
    keys.filter(|k| !k.is_empty())
}

/// Choose the resolution strategy of a fuzzy level.
fn plan_level(
    left: &DataFrame,
    right: &DataFrame,
    binding: &KeyBinding,
    config: LevelConfig,
) -> Result<LevelPlan> {
    if config.fuzzy_how() != FuzzyHow::Left {
        return Err(JoinError::NotSupported(format!(
            "fuzzy how {:?} on '{}': only left fuzzy joins are supported",
            config.fuzzy_how(),
            binding.left
        )));
    }
    validate_cutoff(config.score_cutoff())?;

    if config.has_explicit_differences() {
        if config.direction() != MergeDirection::Nearest {
            return Err(JoinError::config(format!(
                "merge direction on '{}' only applies without explicit difference functions",
                binding.left
            )));
        }
        let strategy = Strategy::Scored(config.differences().to_vec());
        return Ok(LevelPlan { config, strategy });
    }

    check_comparable(left, right, binding)?;
    let strategy = match binding.left_kind {
        kind if kind.is_ordered() => Strategy::SortedMerge(config.direction()),
        ColumnKind::Text if config.direction() == MergeDirection::Nearest => {
            Strategy::Scored(default_difference(ColumnKind::Text).into_iter().collect())
        }
        ColumnKind::Text => {
            return Err(JoinError::config(format!(
                "merge direction on '{}' needs a numeric or temporal key",
                binding.left
            )));
        }
        kind => {
            return Err(JoinError::config(format!(
                "no default difference for {kind} key '{}'; provide a difference function",
                binding.left
            )));
        }
    };
    Ok(LevelPlan { config, strategy })
}

/// A configured top-1 fuzzy join between two datasets.
///
/// Resolved levels are cached after the first [`FuzzyJoin::join`], so
/// repeated joins (for instance with and without debug columns) do not
/// rescore candidates.
#[derive(Debug, Clone)]
pub struct FuzzyJoin {
    left: DataFrame,
    right: DataFrame,
    exact: Vec<KeyBinding>,
    fuzzy: Vec<KeyBinding>,
    exact_how: JoinHow,
    plans: Vec<LevelPlan>,
    cache: BTreeMap<usize, ResolvedMatch>,
}

impl FuzzyJoin {
    /// Start configuring a join. Exactly two datasets are accepted at build time.
    pub fn builder(datasets: Vec<DataFrame>) -> FuzzyJoinBuilder {
        FuzzyJoinBuilder {
            datasets,
            exact: None,
            fuzzy: None,
            exact_how: JoinHow::default(),
            levels: BTreeMap::new(),
            by_dataset: false,
        }
    }

    pub fn exact_keys(&self) -> &[KeyBinding] {
        &self.exact
    }

    pub fn fuzzy_keys(&self) -> &[KeyBinding] {
        &self.fuzzy
    }

    pub fn level_count(&self) -> usize {
        self.fuzzy.len()
    }

    /// Cached resolution of a level, present once [`FuzzyJoin::join`] ran.
    pub fn resolved_level(&self, level: usize) -> Option<&ResolvedMatch> {
        self.cache.get(&level)
    }

    /// Resolve one level on a sample without touching the cache.
    ///
    /// `sample_size` caps the distinct left values considered per block;
    /// zero means no cap.
    pub fn preview_level(&self, level: usize, sample_size: usize) -> Result<ResolvedMatch> {
        self.plan(level)?;
        let limit = (sample_size > 0).then_some(sample_size);
        self.resolve_level(level, limit)
    }

    /// Run the join.
    ///
    /// Each fuzzy level is resolved (or taken from the cache) and attached as
    /// a left join, so left values without a fuzzy match keep their row. The
    /// final merge with the right dataset uses the exact-key join mode. With
    /// no fuzzy keys this is a plain equi-join.
    pub fn join(&mut self, keep_debug: bool) -> Result<JoinResult> {
        let span = info_span!("fuzzy_join", levels = self.fuzzy.len(), how = %self.exact_how);
        let _guard = span.enter();

        if self.fuzzy.is_empty() {
            let frame = exact_join(&self.left, &self.right, &self.exact, self.exact_how)?;
            info!(rows = frame.height(), "exact join complete");
            return Ok(JoinResult {
                frame,
                levels: Vec::new(),
            });
        }

        for level in 0..self.fuzzy.len() {
            if !self.cache.contains_key(&level) {
                let limit = self.plans[level].config.candidate_limit();
                let resolved = self.resolve_level(level, limit)?;
                self.cache.insert(level, resolved);
            } else {
                debug!(level, "using cached resolution");
            }
        }

        let names: Vec<MappingColumns> = (0..self.fuzzy.len())
            .map(|level| MappingColumns::new(level.to_string()))
            .collect();
        let mut base = self.left.clone().lazy();
        let mut levels = Vec::with_capacity(self.fuzzy.len());
        for (level, binding) in self.fuzzy.iter().enumerate() {
            let resolved = self.cache.get(&level).ok_or_else(|| {
                JoinError::config(format!("level {level} was not resolved"))
            })?;
            let mapping = mapping_frame(
                &self.left,
                &self.right,
                binding,
                &self.exact,
                resolved,
                &names[level],
            )?;
            base = attach_mapping(base, mapping, binding, &self.exact, &names[level]);

            let summary = resolved.summarize(level, &binding.left, &binding.right);
            if summary.has_duplicates() {
                warn!(
                    level,
                    column = %binding.left,
                    duplicate_groups = summary.duplicate_groups,
                    "top-1 match has duplicates; tied rows are kept"
                );
            }
            levels.push(summary);
        }

        let fuzzy: Vec<(&KeyBinding, &MappingColumns)> = self.fuzzy.iter().zip(&names).collect();
        let joined = attach_right(
            base,
            &self.left,
            &self.right,
            &self.exact,
            &fuzzy,
            join_type(self.exact_how),
        )?
        .collect()?;
        info!(rows = joined.height(), "fuzzy join complete");

        Ok(JoinResult {
            frame: strip_internal(joined, keep_debug)?,
            levels,
        })
    }

    fn plan(&self, level: usize) -> Result<&LevelPlan> {
        self.plans.get(level).ok_or_else(|| {
            JoinError::config(format!(
                "level {level} does not exist; {} fuzzy keys are declared",
                self.fuzzy.len()
            ))
        })
    }

    fn resolve_level(&self, level: usize, limit: Option<usize>) -> Result<ResolvedMatch> {
        let plan = self.plan(level)?;
        let binding = &self.fuzzy[level];
        let span = info_span!("resolve_level", level, left = %binding.left, right = %binding.right);
        let _guard = span.enter();

        match &plan.strategy {
            Strategy::SortedMerge(direction) => {
                let resolved = resolve_sorted(
                    &self.left,
                    &self.right,
                    binding,
                    &self.exact,
                    *direction,
                    plan.config.score_cutoff(),
                )?;
                Ok(match limit {
                    Some(limit) => limit_per_block(resolved, limit),
                    None => resolved,
                })
            }
            Strategy::Scored(differences) => {
                let candidates =
                    compute_candidates(&self.left, &self.right, binding, &self.exact, limit)?;
                let scored =
                    score_candidates(candidates, differences, plan.config.score_cutoff())?;
                Ok(select_top1(scored))
            }
        }
    }
}

/// Keep the first `limit` left values of every block.
fn limit_per_block(resolved: ResolvedMatch, limit: usize) -> ResolvedMatch {
    let mut seen: BTreeMap<_, usize> = BTreeMap::new();
    let groups = resolved
        .groups
        .into_iter()
        .filter(|group| {
            let count = seen.entry(group.block.clone()).or_default();
            *count += 1;
            *count <= limit
        })
        .collect();
    ResolvedMatch::new(groups)
}

/// Result of a single-level [`merge_top1`].
#[derive(Debug, Clone)]
pub struct Top1Merge {
    pub resolved: ResolvedMatch,
    pub joined: JoinResult,
}

/// One-shot top-1 merge on a single fuzzy key with optional exact block keys.
///
/// The left dataset is joined with a left join: every left row survives and
/// unmatched rows carry nulls in the right columns.
pub fn merge_top1(
    left: &DataFrame,
    right: &DataFrame,
    fuzzy: &[KeyBinding],
    exact: &[KeyBinding],
    config: LevelConfig,
    keep_debug: bool,
) -> Result<Top1Merge> {
    let binding = match fuzzy {
        [binding] => binding,
        [] => return Err(JoinError::config("merge_top1 needs a fuzzy key")),
        _ => {
            return Err(JoinError::NotSupported(format!(
                "merge_top1 joins on one fuzzy key, got {}",
                fuzzy.len()
            )));
        }
    };
    let span = info_span!("merge_top1", left = %binding.left, right = %binding.right);
    let _guard = span.enter();

    let plan = plan_level(left, right, binding, config)?;
    let limit = plan.config.candidate_limit();
    let resolved = match &plan.strategy {
        Strategy::SortedMerge(direction) => {
            let resolved = resolve_sorted(
                left,
                right,
                binding,
                exact,
                *direction,
                plan.config.score_cutoff(),
            )?;
            match limit {
                Some(limit) => limit_per_block(resolved, limit),
                None => resolved,
            }
        }
        Strategy::Scored(differences) => {
            let candidates = compute_candidates(left, right, binding, exact, limit)?;
            select_top1(score_candidates(
                candidates,
                differences,
                plan.config.score_cutoff(),
            )?)
        }
    };
    let joined = assemble_join(left, right, binding, exact, &resolved, keep_debug)?;
    Ok(Top1Merge { resolved, joined })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{DataType, NamedFrom, Series, TimeUnit};

    fn people() -> (DataFrame, DataFrame) {
        let left = DataFrame::new(vec![
            Series::new("id".into(), vec![1i64, 1, 2]).into(),
            Series::new("name".into(), vec!["cat", "dog", "emu"]).into(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("id".into(), vec![1i64, 1, 3]).into(),
            Series::new("name".into(), vec!["bat", "dog", "emu"]).into(),
            Series::new("score".into(), vec![10i64, 20, 30]).into(),
        ])
        .unwrap();
        (left, right)
    }

    #[test]
    fn test_requires_keys() {
        let (left, right) = people();
        let err = FuzzyJoin::builder(vec![left, right]).build().unwrap_err();
        assert!(matches!(err, JoinError::Configuration(_)));
    }

    #[test]
    fn test_requires_two_datasets() {
        let (left, _) = people();
        let err = FuzzyJoin::builder(vec![left])
            .fuzzy_keys("name")
            .build()
            .unwrap_err();
        assert!(matches!(err, JoinError::Configuration(_)));
    }

    #[test]
    fn test_type_mismatch_without_difference() {
        let left = DataFrame::new(vec![Series::new("k".into(), vec!["a"]).into()]).unwrap();
        let right = DataFrame::new(vec![Series::new("k".into(), vec![1i64]).into()]).unwrap();
        let err = FuzzyJoin::builder(vec![left.clone(), right.clone()])
            .fuzzy_keys("k")
            .build()
            .unwrap_err();
        assert!(matches!(err, JoinError::TypeMismatch { .. }));

        // An explicit difference function accepts mixed kinds.
        let config = LevelConfig::new().with_difference(Difference::new("one", |_, _| 1.0));
        assert!(
            FuzzyJoin::builder(vec![left, right])
                .fuzzy_keys("k")
                .level(0, config)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_date_against_datetime_is_a_type_mismatch() {
        // 2024-01-01 and 2024-01-10 as days; 2024-01-09 and 2024-01-02 as ms.
        let left = DataFrame::new(vec![
            Series::new("day".into(), vec![19_723i32, 19_732])
                .cast(&DataType::Date)
                .unwrap()
                .into(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("day".into(), vec![1_704_758_400_000i64, 1_704_153_600_000])
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .unwrap()
                .into(),
        ])
        .unwrap();
        let err = FuzzyJoin::builder(vec![left, right])
            .fuzzy_keys("day")
            .build()
            .unwrap_err();
        assert!(matches!(err, JoinError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unsupported_fuzzy_how() {
        let (left, right) = people();
        let err = FuzzyJoin::builder(vec![left, right])
            .fuzzy_keys("name")
            .level(0, LevelConfig::new().with_fuzzy_how(FuzzyHow::Inner))
            .build()
            .unwrap_err();
        assert!(matches!(err, JoinError::NotSupported(_)));
    }

    #[test]
    fn test_level_out_of_range() {
        let (left, right) = people();
        let err = FuzzyJoin::builder(vec![left, right])
            .fuzzy_keys("name")
            .level(3, LevelConfig::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, JoinError::Configuration(_)));
    }

    #[test]
    fn test_blocked_join_and_cache() {
        let (left, right) = people();
        let mut join = FuzzyJoin::builder(vec![left, right])
            .exact_keys("id")
            .fuzzy_keys("name")
            .exact_how(JoinHow::Left)
            .build()
            .unwrap();
        assert!(join.resolved_level(0).is_none());

        let result = join.join(false).unwrap();
        // id=2 "emu" has no block partner on the right
        assert_eq!(result.frame.height(), 3);
        assert_eq!(result.levels[0].groups, 2);
        assert!(join.resolved_level(0).is_some());

        let again = join.join(true).unwrap();
        assert_eq!(again.frame.height(), 3);
        assert!(again.frame.width() > result.frame.width());
    }

    #[test]
    fn test_exact_only_join() {
        let (left, right) = people();
        let mut join = FuzzyJoin::builder(vec![left, right])
            .exact_keys(vec!["id", "name"])
            .build()
            .unwrap();
        let result = join.join(false).unwrap();
        assert_eq!(result.frame.height(), 1);
        assert!(result.levels.is_empty());
    }

    #[test]
    fn test_preview_does_not_fill_cache() {
        let (left, right) = people();
        let join = FuzzyJoin::builder(vec![left, right])
            .fuzzy_keys("name")
            .build()
            .unwrap();
        let preview = join.preview_level(0, 1).unwrap();
        assert_eq!(preview.groups.len(), 1);
        assert!(join.resolved_level(0).is_none());
        assert!(join.preview_level(1, 0).is_err());
    }

    #[test]
    fn test_merge_top1_rejects_multiple_fuzzy_keys() {
        let (left, right) = people();
        let bindings = resolve_keys(&[left.clone(), right.clone()], &vec!["id", "name"].into(), false)
            .unwrap();
        let err = merge_top1(&left, &right, &bindings, &[], LevelConfig::new(), false).unwrap_err();
        assert!(matches!(err, JoinError::NotSupported(_)));
    }
}
