//! Join key resolution.
//!
//! Normalizes the accepted key declaration shapes into equal-length column
//! pairs and validates them against both dataset schemas. No data is scanned.

use fjoin_model::{ColumnKind, JoinError, KeyBinding, KeyDeclaration, Result};
use polars::prelude::DataFrame;

/// Resolve a key declaration into validated bindings.
///
/// With `by_dataset = false` the outer list indexes join levels: a flat list
/// names shared columns and a nested list holds `[left, right]` pairs. With
/// `by_dataset = true` the outer list indexes datasets and must hold one
/// equal-length column list per dataset.
///
/// Bindings come back tagged [`fjoin_model::KeyRole::Exact`].
pub fn resolve_keys(
    datasets: &[DataFrame],
    declaration: &KeyDeclaration,
    by_dataset: bool,
) -> Result<Vec<KeyBinding>> {
    let [left, right] = datasets else {
        return Err(JoinError::config(format!(
            "joins are pairwise: expected 2 datasets, got {}",
            datasets.len()
        )));
    };

    let pairs = column_pairs(declaration, by_dataset)?;
    if pairs.is_empty() {
        return Err(JoinError::config("no join keys declared"));
    }

    pairs
        .into_iter()
        .map(|(left_column, right_column)| {
            let left_kind = column_kind(left, 0, &left_column)?;
            let right_kind = column_kind(right, 1, &right_column)?;
            Ok(KeyBinding::new(
                left_column,
                right_column,
                left_kind,
                right_kind,
            ))
        })
        .collect()
}

fn column_pairs(declaration: &KeyDeclaration, by_dataset: bool) -> Result<Vec<(String, String)>> {
    match (declaration, by_dataset) {
        (KeyDeclaration::Single(column), _) => Ok(vec![(column.clone(), column.clone())]),
        (KeyDeclaration::List(columns), false) => Ok(columns
            .iter()
            .map(|column| (column.clone(), column.clone()))
            .collect()),
        (KeyDeclaration::List(columns), true) => match columns.as_slice() {
            [left, right] => Ok(vec![(left.clone(), right.clone())]),
            _ => Err(JoinError::config(format!(
                "per-dataset keys need one column per dataset, got {}",
                columns.len()
            ))),
        },
        (KeyDeclaration::Nested(pairs), false) => pairs
            .iter()
            .map(|pair| match pair.as_slice() {
                [column] => Ok((column.clone(), column.clone())),
                [left, right] => Ok((left.clone(), right.clone())),
                _ => Err(JoinError::config(format!(
                    "a key pair names one shared column or a [left, right] pair, got {} columns",
                    pair.len()
                ))),
            })
            .collect(),
        (KeyDeclaration::Nested(lists), true) => {
            let [left, right] = lists.as_slice() else {
                return Err(JoinError::config(format!(
                    "per-dataset keys need exactly 2 column lists, got {}",
                    lists.len()
                )));
            };
            if left.len() != right.len() {
                return Err(JoinError::config(format!(
                    "per-dataset key lists differ in length: {} vs {}",
                    left.len(),
                    right.len()
                )));
            }
            Ok(left.iter().cloned().zip(right.iter().cloned()).collect())
        }
    }
}

fn column_kind(df: &DataFrame, dataset: usize, column: &str) -> Result<ColumnKind> {
    df.column(column)
        .map(|c| ColumnKind::from_dtype(c.dtype()))
        .map_err(|_| JoinError::MissingColumn {
            dataset,
            column: column.to_string(),
        })
}
