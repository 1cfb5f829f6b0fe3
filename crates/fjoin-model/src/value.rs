//! Key values extracted from DataFrame columns.
//!
//! A [`KeyValue`] is the non-null scalar a join key takes in one row. Values
//! are totally ordered so they can key `BTreeMap`/`BTreeSet` collections and
//! give deterministic candidate ordering. [`ColumnKind`] classifies a column's
//! dtype once, when a key binding is validated.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataType, NamedFrom, PolarsResult, Series};
use serde::{Deserialize, Serialize};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Kind of a key column, resolved from its dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Integer and floating point columns.
    Numeric,
    /// Date and datetime columns.
    Temporal,
    /// String columns.
    Text,
    /// Anything else (booleans, nested types, durations...).
    Other,
}

impl ColumnKind {
    /// Classify a polars dtype.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Date | DataType::Datetime(_, _) => ColumnKind::Temporal,
            DataType::String => ColumnKind::Text,
            dtype if dtype.is_integer() || dtype.is_float() => ColumnKind::Numeric,
            _ => ColumnKind::Other,
        }
    }

    /// True for kinds that are totally ordered and subtractable.
    pub fn is_ordered(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Temporal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Temporal => "temporal",
            ColumnKind::Text => "text",
            ColumnKind::Other => "other",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-null key value.
///
/// Dates are stored as days since the Unix epoch and datetimes as ticks in
/// the column's own time unit, mirroring the polars physical representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(i32),
    Datetime(i64),
}

impl KeyValue {
    /// Convert a polars value, returning `None` for nulls.
    pub fn from_any(value: AnyValue<'_>) -> Option<Self> {
        let key = match value {
            AnyValue::Null => return None,
            AnyValue::Boolean(b) => KeyValue::Boolean(b),
            AnyValue::Int8(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::Int16(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::Int32(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::Int64(v) => KeyValue::Integer(v),
            AnyValue::UInt8(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::UInt16(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::UInt32(v) => KeyValue::Integer(i64::from(v)),
            AnyValue::UInt64(v) => match i64::try_from(v) {
                Ok(v) => KeyValue::Integer(v),
                Err(_) => KeyValue::Float(v as f64),
            },
            AnyValue::Float32(v) => KeyValue::Float(f64::from(v)),
            AnyValue::Float64(v) => KeyValue::Float(v),
            AnyValue::String(s) => KeyValue::Text(s.to_string()),
            AnyValue::StringOwned(s) => KeyValue::Text(s.to_string()),
            AnyValue::Date(days) => KeyValue::Date(days),
            AnyValue::Datetime(ticks, _, _) => KeyValue::Datetime(ticks),
            other => KeyValue::Text(other.to_string()),
        };
        Some(key)
    }

    /// Numeric view used by arithmetic differences and the sorted merge.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeyValue::Integer(v) => Some(*v as f64),
            KeyValue::Float(v) => Some(*v),
            KeyValue::Date(v) => Some(f64::from(*v)),
            KeyValue::Datetime(v) => Some(*v as f64),
            KeyValue::Boolean(_) | KeyValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            KeyValue::Integer(v) | KeyValue::Datetime(v) => Some(*v),
            KeyValue::Date(v) => Some(i64::from(*v)),
            KeyValue::Float(v) => Some(*v as i64),
            KeyValue::Boolean(_) | KeyValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            KeyValue::Boolean(_) => 0,
            KeyValue::Integer(_) => 1,
            KeyValue::Float(_) => 2,
            KeyValue::Date(_) => 3,
            KeyValue::Datetime(_) => 4,
            KeyValue::Text(_) => 5,
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyValue::Boolean(a), KeyValue::Boolean(b)) => a.cmp(b),
            (KeyValue::Integer(a), KeyValue::Integer(b)) => a.cmp(b),
            (KeyValue::Float(a), KeyValue::Float(b)) if a == b => Ordering::Equal,
            (KeyValue::Float(a), KeyValue::Float(b)) => a.total_cmp(b),
            (KeyValue::Integer(a), KeyValue::Float(b)) => cmp_integer_float(*a, *b),
            (KeyValue::Float(a), KeyValue::Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (KeyValue::Date(a), KeyValue::Date(b)) => a.cmp(b),
            (KeyValue::Datetime(a), KeyValue::Datetime(b)) => a.cmp(b),
            (KeyValue::Text(a), KeyValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Exact numeric comparison of an integer with a float.
///
/// NaNs sort as in `f64::total_cmp`: negative NaN first, positive NaN last.
fn cmp_integer_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float above every i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    int.cmp(&(whole as i64)).then_with(|| {
        let fract = float - whole;
        if fract > 0.0 {
            Ordering::Less
        } else if fract < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Boolean(b) => write!(f, "{b}"),
            KeyValue::Integer(v) => write!(f, "{v}"),
            KeyValue::Float(v) => write!(f, "{v}"),
            KeyValue::Text(s) => f.write_str(s),
            KeyValue::Date(days) => {
                match NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE) {
                    Some(date) => write!(f, "{date}"),
                    None => write!(f, "{days}"),
                }
            }
            KeyValue::Datetime(ticks) => write!(f, "{ticks}"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Integer(value)
    }
}

impl From<f64> for KeyValue {
    fn from(value: f64) -> Self {
        KeyValue::Float(value)
    }
}

/// Build a series of `dtype` from key values.
///
/// Values are first laid out in the physical type of `dtype` and then cast,
/// so temporal columns keep their time unit and time zone. Values of the wrong
/// shape become nulls.
pub fn key_values_to_series(
    name: &str,
    values: &[Option<&KeyValue>],
    dtype: &DataType,
) -> PolarsResult<Series> {
    let series = match dtype {
        DataType::Boolean => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| match v {
                    Some(KeyValue::Boolean(b)) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ),
        DataType::Date => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(KeyValue::as_i64).map(|d| d as i32))
                .collect::<Vec<_>>(),
        ),
        dtype if dtype.is_float() => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(KeyValue::as_f64))
                .collect::<Vec<_>>(),
        ),
        dtype if dtype.is_integer() || matches!(dtype, DataType::Datetime(_, _)) => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.and_then(KeyValue::as_i64))
                .collect::<Vec<_>>(),
        ),
        _ => Series::new(
            name.into(),
            values
                .iter()
                .map(|v| v.map(ToString::to_string))
                .collect::<Vec<_>>(),
        ),
    };
    series.cast(dtype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::TimeUnit;

    #[test]
    fn test_column_kind_from_dtype() {
        assert_eq!(ColumnKind::from_dtype(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_dtype(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_dtype(&DataType::String), ColumnKind::Text);
        assert_eq!(ColumnKind::from_dtype(&DataType::Date), ColumnKind::Temporal);
        assert_eq!(
            ColumnKind::from_dtype(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            ColumnKind::Temporal
        );
        assert_eq!(ColumnKind::from_dtype(&DataType::Boolean), ColumnKind::Other);
    }

    #[test]
    fn test_from_any_skips_nulls() {
        assert_eq!(KeyValue::from_any(AnyValue::Null), None);
        assert_eq!(
            KeyValue::from_any(AnyValue::Int32(4)),
            Some(KeyValue::Integer(4))
        );
        assert_eq!(
            KeyValue::from_any(AnyValue::String("cat")),
            Some(KeyValue::Text("cat".to_string()))
        );
    }

    #[test]
    fn test_float_ordering_is_total() {
        let mut values = vec![
            KeyValue::Float(2.5),
            KeyValue::Float(f64::NAN),
            KeyValue::Float(-1.0),
        ];
        values.sort();
        assert_eq!(values[0], KeyValue::Float(-1.0));
        assert_eq!(values[1], KeyValue::Float(2.5));
    }

    #[test]
    fn test_integer_and_float_compare_numerically() {
        assert_eq!(KeyValue::Integer(1), KeyValue::Float(1.0));
        assert_eq!(KeyValue::Integer(0), KeyValue::Float(-0.0));
        assert!(KeyValue::Integer(1) < KeyValue::Float(1.5));
        assert!(KeyValue::Float(-1.5) < KeyValue::Integer(-1));
        assert!(KeyValue::Integer(i64::MAX) < KeyValue::Float(1e19));
        assert!(KeyValue::Integer(i64::MAX) < KeyValue::Float(f64::NAN));

        let floats: std::collections::BTreeSet<_> =
            [KeyValue::Float(2.0), KeyValue::Float(3.5)].into_iter().collect();
        assert!(floats.contains(&KeyValue::Integer(2)));
        assert!(!floats.contains(&KeyValue::Integer(3)));
    }

    #[test]
    fn test_date_display() {
        assert_eq!(KeyValue::Date(0).to_string(), "1970-01-01");
        assert_eq!(KeyValue::Date(19_723).to_string(), "2024-01-01");
    }

    #[test]
    fn test_key_values_to_series_keeps_dtype() {
        let a = KeyValue::Integer(3);
        let b = KeyValue::Integer(7);
        let series = key_values_to_series("id", &[Some(&a), None, Some(&b)], &DataType::Int32)
            .unwrap();
        assert_eq!(series.dtype(), &DataType::Int32);
        assert_eq!(series.null_count(), 1);

        let date = KeyValue::Date(19_723);
        let series = key_values_to_series("day", &[Some(&date)], &DataType::Date).unwrap();
        assert_eq!(series.dtype(), &DataType::Date);
    }
}
