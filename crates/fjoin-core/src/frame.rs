//! DataFrame access helpers shared by the matching stages.

use std::collections::{BTreeMap, BTreeSet};

use fjoin_model::{BlockKey, JoinError, KeyBinding, KeyValue, Result};
use polars::prelude::{
    Column, DataFrame, DataType, Expr, IntoLazy, PolarsResult, UniqueKeepStrategy, col,
};

/// Distinct fuzzy values per block key.
pub type KeyIndex = BTreeMap<BlockKey, BTreeSet<KeyValue>>;

/// Which side of a binding to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn column(self, binding: &KeyBinding) -> &str {
        match self {
            Side::Left => &binding.left,
            Side::Right => &binding.right,
        }
    }
}

/// Collect distinct non-null (block key, value) tuples of one dataset.
///
/// Block columns are read in binding order; an empty `blocks` slice puts
/// every row in the single global block. Rows with a null block value or a
/// null fuzzy value are skipped.
pub fn distinct_keys(
    df: &DataFrame,
    side: Side,
    fuzzy: &KeyBinding,
    blocks: &[KeyBinding],
) -> Result<KeyIndex> {
    let fuzzy_column = side.column(fuzzy);
    let selection: Vec<Expr> = blocks
        .iter()
        .map(|binding| col(side.column(binding)))
        .chain(std::iter::once(col(fuzzy_column)))
        .collect();
    let distinct = df
        .clone()
        .lazy()
        .select(selection)
        .drop_nulls(None)
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    let values = distinct.column(fuzzy_column)?;
    let block_columns = blocks
        .iter()
        .map(|binding| distinct.column(side.column(binding)))
        .collect::<PolarsResult<Vec<&Column>>>()?;

    let mut index = KeyIndex::new();
    'rows: for idx in 0..distinct.height() {
        let Some(value) = KeyValue::from_any(values.get(idx)?) else {
            continue;
        };
        let mut block = Vec::with_capacity(block_columns.len());
        for column in &block_columns {
            match KeyValue::from_any(column.get(idx)?) {
                Some(key) => block.push(key),
                None => continue 'rows,
            }
        }
        index.entry(block).or_default().insert(value);
    }
    Ok(index)
}

/// Dtype of a column that has already been validated to exist.
pub fn column_dtype(df: &DataFrame, name: &str) -> Result<DataType> {
    Ok(df.column(name)?.dtype().clone())
}

/// Fail with [`JoinError::TypeMismatch`] unless both columns of an ordered
/// binding share one scale.
///
/// Dates count days and datetimes count ticks of their time unit, so a date
/// never compares with a datetime, nor a millisecond datetime with a
/// nanosecond one. Integers and floats compare as numbers.
pub fn check_comparable(left: &DataFrame, right: &DataFrame, binding: &KeyBinding) -> Result<()> {
    let left_dtype = column_dtype(left, &binding.left)?;
    let right_dtype = column_dtype(right, &binding.right)?;
    let same_scale = match (&left_dtype, &right_dtype) {
        (DataType::Date, DataType::Date) => true,
        (DataType::Datetime(a, _), DataType::Datetime(b, _)) => a == b,
        (DataType::Date | DataType::Datetime(_, _), _)
        | (_, DataType::Date | DataType::Datetime(_, _)) => false,
        _ => binding.kinds_match(),
    };
    if same_scale {
        Ok(())
    } else {
        Err(JoinError::TypeMismatch {
            left: binding.left.clone(),
            right: binding.right.clone(),
            left_type: left_dtype.to_string(),
            right_type: right_dtype.to_string(),
        })
    }
}
