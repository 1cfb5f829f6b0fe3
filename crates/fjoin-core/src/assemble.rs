//! Join assembly.
//!
//! A resolved level becomes a mapping table of (block keys, left value,
//! right value, scores, match type). The left dataset is left-joined to the
//! mapping, then joined to the right dataset on (block keys, mapped right
//! value). Right-side columns that collide with left columns get the
//! `__right__` suffix. Columns starting with `__` are internal and dropped
//! unless debug output is requested.

use fjoin_model::{
    JoinHow, JoinResult, KeyBinding, KeyValue, ResolvedMatch, Result, key_values_to_series,
};
use polars::prelude::*;
use tracing::debug;

use crate::frame::column_dtype;

pub const RIGHT_SUFFIX: &str = "__right__";
pub const INTERNAL_PREFIX: &str = "__";

const LEFT_KEY: &str = "__top1left__";
const RIGHT_KEY: &str = "__top1right__";
const JOIN_KEY: &str = "__top1key__";
const DIFF: &str = "__top1diff__";
const MATCH_TYPE: &str = "__matchtype__";

/// Internal column names of one level's mapping table.
///
/// The tag keeps levels apart when several mappings are attached to the
/// same frame; a single-level join uses the empty tag.
#[derive(Debug, Clone)]
pub struct MappingColumns {
    tag: String,
}

impl MappingColumns {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn left(&self) -> String {
        format!("{LEFT_KEY}{}", self.tag)
    }

    pub fn right(&self) -> String {
        format!("{RIGHT_KEY}{}", self.tag)
    }

    pub fn join_key(&self) -> String {
        format!("{JOIN_KEY}{}", self.tag)
    }

    /// Score column `index` of the tie-break chain.
    pub fn diff(&self, index: usize) -> String {
        if index == 0 {
            format!("{DIFF}{}", self.tag)
        } else {
            format!("__top1diff{index}__{}", self.tag)
        }
    }

    pub fn match_type(&self) -> String {
        format!("{MATCH_TYPE}{}", self.tag)
    }
}

/// Map an exact-key join mode to the polars join type.
pub fn join_type(how: JoinHow) -> JoinType {
    match how {
        JoinHow::Inner => JoinType::Inner,
        JoinHow::Left => JoinType::Left,
        JoinHow::Right => JoinType::Right,
        JoinHow::Outer => JoinType::Full,
    }
}

fn join_args(how: JoinType) -> JoinArgs {
    JoinArgs::new(how)
        .with_suffix(Some(RIGHT_SUFFIX.into()))
        .with_coalesce(JoinCoalesce::CoalesceColumns)
}

/// Mapping table of one resolved level, one row per (left, right) match.
///
/// Block and value columns keep the dtypes of their source columns so the
/// later joins compare like with like.
pub fn mapping_frame(
    left: &DataFrame,
    right: &DataFrame,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
    resolved: &ResolvedMatch,
    names: &MappingColumns,
) -> Result<DataFrame> {
    let rows: Vec<_> = resolved.rows().collect();
    let mut columns: Vec<Column> = Vec::with_capacity(blocks.len() + 4);

    for (index, binding) in blocks.iter().enumerate() {
        let values: Vec<Option<&KeyValue>> = rows.iter().map(|r| r.block().get(index)).collect();
        let dtype = column_dtype(left, &binding.left)?;
        columns.push(key_values_to_series(&binding.left, &values, &dtype)?.into_column());
    }

    let lefts: Vec<Option<&KeyValue>> = rows.iter().map(|r| Some(r.left())).collect();
    let dtype = column_dtype(left, &fuzzy.left)?;
    columns.push(key_values_to_series(&names.left(), &lefts, &dtype)?.into_column());

    let rights: Vec<Option<&KeyValue>> = rows.iter().map(|r| Some(r.right())).collect();
    let dtype = column_dtype(right, &fuzzy.right)?;
    columns.push(key_values_to_series(&names.right(), &rights, &dtype)?.into_column());

    let chain = rows.iter().map(|r| r.diffs.len()).max().unwrap_or(1).max(1);
    for index in 0..chain {
        let scores: Vec<Option<f64>> = rows.iter().map(|r| r.diffs.get(index).copied()).collect();
        columns.push(Series::new(names.diff(index).into(), scores).into_column());
    }

    let match_types: Vec<&str> = rows.iter().map(|r| r.match_type().as_str()).collect();
    columns.push(Series::new(names.match_type().into(), match_types).into_column());

    Ok(DataFrame::new(columns)?)
}

/// Left-join a mapping table onto `base` by (block keys, left value).
pub fn attach_mapping(
    base: LazyFrame,
    mapping: DataFrame,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
    names: &MappingColumns,
) -> LazyFrame {
    let mut left_on: Vec<Expr> = blocks.iter().map(|b| col(b.left.as_str())).collect();
    let mut right_on = left_on.clone();
    left_on.push(col(fuzzy.left.as_str()));
    right_on.push(col(names.left().as_str()));
    base.join(mapping.lazy(), left_on, right_on, join_args(JoinType::Left))
}

/// Join the right dataset onto `base` by exact keys plus the mapped right
/// value of every fuzzy level.
///
/// Right block columns are cast to the left dtype when they differ. With no
/// fuzzy levels this is a plain equi-join on the exact keys.
pub fn attach_right(
    base: LazyFrame,
    left: &DataFrame,
    right: &DataFrame,
    blocks: &[KeyBinding],
    fuzzy: &[(&KeyBinding, &MappingColumns)],
    how: JoinType,
) -> Result<LazyFrame> {
    let mut right_lf = right.clone().lazy();
    let mut left_on = Vec::with_capacity(blocks.len() + fuzzy.len());
    let mut right_on = Vec::with_capacity(blocks.len() + fuzzy.len());

    for binding in blocks {
        let left_dtype = column_dtype(left, &binding.left)?;
        if column_dtype(right, &binding.right)? != left_dtype {
            right_lf = right_lf.with_column(col(binding.right.as_str()).cast(left_dtype));
        }
        left_on.push(col(binding.left.as_str()));
        right_on.push(col(binding.right.as_str()));
    }

    for (binding, names) in fuzzy {
        let key = names.join_key();
        right_lf = right_lf.with_column(col(binding.right.as_str()).alias(key.as_str()));
        left_on.push(col(names.right().as_str()));
        right_on.push(col(key.as_str()));
    }

    Ok(base.join(right_lf, left_on, right_on, join_args(how)))
}

/// Drop internal `__` columns unless `keep_debug` is set.
pub fn strip_internal(df: DataFrame, keep_debug: bool) -> Result<DataFrame> {
    if keep_debug {
        return Ok(df);
    }
    let keep: Vec<PlSmallStr> = df
        .get_column_names_owned()
        .into_iter()
        .filter(|name| !name.starts_with(INTERNAL_PREFIX))
        .collect();
    Ok(df.select(keep)?)
}

/// Join two datasets on exact keys only.
pub fn exact_join(
    left: &DataFrame,
    right: &DataFrame,
    exact: &[KeyBinding],
    how: JoinHow,
) -> Result<DataFrame> {
    let joined = attach_right(left.clone().lazy(), left, right, exact, &[], join_type(how))?;
    Ok(joined.collect()?)
}

/// Join one resolved fuzzy level (plus optional exact block keys) into the
/// final table.
///
/// Every left row is kept. Left rows whose value has no match carry nulls in
/// the right columns; tied matches repeat the left row.
pub fn assemble_join(
    left: &DataFrame,
    right: &DataFrame,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
    resolved: &ResolvedMatch,
    keep_debug: bool,
) -> Result<JoinResult> {
    let names = MappingColumns::new("");
    let mapping = mapping_frame(left, right, fuzzy, blocks, resolved, &names)?;
    let base = attach_mapping(left.clone().lazy(), mapping, fuzzy, blocks, &names);
    let joined = attach_right(
        base,
        left,
        right,
        blocks,
        &[(fuzzy, &names)],
        JoinType::Left,
    )?
    .collect()?;
    debug!(
        left_rows = left.height(),
        rows = joined.height(),
        "assembled join"
    );

    Ok(JoinResult {
        frame: strip_internal(joined, keep_debug)?,
        levels: vec![resolved.summarize(0, &fuzzy.left, &fuzzy.right)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjoin_model::{Candidate, ColumnKind, MatchGroup, ScoredCandidate};

    fn text(column: &str) -> KeyBinding {
        KeyBinding::new(column, column, ColumnKind::Text, ColumnKind::Text)
    }

    fn group(left: &str, rights: &[(&str, f64)]) -> MatchGroup {
        MatchGroup {
            block: vec![],
            left: left.into(),
            matches: rights
                .iter()
                .map(|(right, diff)| {
                    let candidate = if left == *right {
                        Candidate::exact(vec![], left.into())
                    } else {
                        Candidate::approx(vec![], left.into(), (*right).into())
                    };
                    ScoredCandidate::new(candidate, vec![*diff])
                })
                .collect(),
        }
    }

    fn frames() -> (DataFrame, DataFrame) {
        let left = DataFrame::new(vec![
            Series::new("name".into(), vec!["cat", "dog", "emu"]).into(),
            Series::new("age".into(), vec![1i64, 2, 3]).into(),
        ])
        .unwrap();
        let right = DataFrame::new(vec![
            Series::new("name".into(), vec!["bat", "dog"]).into(),
            Series::new("score".into(), vec![10i64, 20]).into(),
        ])
        .unwrap();
        (left, right)
    }

    #[test]
    fn test_assemble_keeps_left_rows_and_suffixes_right() {
        let (left, right) = frames();
        let resolved = ResolvedMatch::new(vec![
            group("cat", &[("bat", 1.0)]),
            group("dog", &[("dog", 0.0)]),
        ]);
        let result = assemble_join(&left, &right, &text("name"), &[], &resolved, false).unwrap();
        let frame = result.frame.sort(["name"], Default::default()).unwrap();

        assert_eq!(frame.height(), 3);
        let names: Vec<_> = frame.get_column_names_owned();
        assert_eq!(
            names,
            vec![
                PlSmallStr::from("name"),
                PlSmallStr::from("age"),
                PlSmallStr::from("name__right__"),
                PlSmallStr::from("score"),
            ]
        );
        let matched: Vec<Option<&str>> = frame
            .column("name__right__")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(matched, vec![Some("bat"), Some("dog"), None]);
    }

    #[test]
    fn test_debug_columns_are_kept_on_request() {
        let (left, right) = frames();
        let resolved = ResolvedMatch::new(vec![group("cat", &[("bat", 1.0)])]);
        let result = assemble_join(&left, &right, &text("name"), &[], &resolved, true).unwrap();
        let names = result.frame.get_column_names_owned();
        assert!(names.iter().any(|n| n.as_str() == "__top1diff__"));
        assert!(names.iter().any(|n| n.as_str() == "__matchtype__"));
    }

    #[test]
    fn test_ties_repeat_left_row() {
        let (left, _) = frames();
        let right = DataFrame::new(vec![
            Series::new("name".into(), vec!["bat", "cut"]).into(),
            Series::new("score".into(), vec![10i64, 20]).into(),
        ])
        .unwrap();
        let resolved = ResolvedMatch::new(vec![group("cat", &[("bat", 1.0), ("cut", 1.0)])]);
        let result = assemble_join(&left, &right, &text("name"), &[], &resolved, false).unwrap();
        assert_eq!(result.frame.height(), 4);
        assert!(result.has_duplicates());
    }

    #[test]
    fn test_mapping_frame_keeps_source_dtypes() {
        let left = DataFrame::new(vec![Series::new("v".into(), vec![1i32, 4]).into()]).unwrap();
        let right = DataFrame::new(vec![Series::new("v".into(), vec![2i32]).into()]).unwrap();
        let binding = KeyBinding::new("v", "v", ColumnKind::Numeric, ColumnKind::Numeric);
        let resolved = ResolvedMatch::new(vec![MatchGroup {
            block: vec![],
            left: KeyValue::Integer(1),
            matches: vec![ScoredCandidate::new(
                Candidate::approx(vec![], KeyValue::Integer(1), KeyValue::Integer(2)),
                vec![1.0],
            )],
        }]);
        let mapping = mapping_frame(
            &left,
            &right,
            &binding,
            &[],
            &resolved,
            &MappingColumns::new(""),
        )
        .unwrap();
        assert_eq!(mapping.column("__top1left__").unwrap().dtype(), &DataType::Int32);
        assert_eq!(mapping.column("__top1right__").unwrap().dtype(), &DataType::Int32);
    }

    #[test]
    fn test_exact_join_modes() {
        let (left, right) = frames();
        let inner = exact_join(&left, &right, &[text("name")], JoinHow::Inner).unwrap();
        assert_eq!(inner.height(), 1);
        let outer = exact_join(&left, &right, &[text("name")], JoinHow::Outer).unwrap();
        assert_eq!(outer.height(), 4);
    }
}
