//! Join key declarations and validated key bindings.

use serde::{Deserialize, Serialize};

use crate::value::ColumnKind;

/// How join keys are declared by the caller.
///
/// The meaning of the outer list depends on the `by_dataset` flag passed to
/// the resolver: it either indexes join levels or datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyDeclaration {
    /// One column name shared by both datasets.
    Single(String),
    /// A flat list of column names.
    List(Vec<String>),
    /// An explicit list of lists.
    Nested(Vec<Vec<String>>),
}

impl KeyDeclaration {
    pub fn is_empty(&self) -> bool {
        match self {
            KeyDeclaration::Single(name) => name.is_empty(),
            KeyDeclaration::List(names) => names.is_empty(),
            KeyDeclaration::Nested(lists) => lists.is_empty(),
        }
    }
}

impl From<&str> for KeyDeclaration {
    fn from(value: &str) -> Self {
        KeyDeclaration::Single(value.to_string())
    }
}

impl From<String> for KeyDeclaration {
    fn from(value: String) -> Self {
        KeyDeclaration::Single(value)
    }
}

impl From<Vec<&str>> for KeyDeclaration {
    fn from(value: Vec<&str>) -> Self {
        KeyDeclaration::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for KeyDeclaration {
    fn from(value: Vec<String>) -> Self {
        KeyDeclaration::List(value)
    }
}

impl From<Vec<Vec<&str>>> for KeyDeclaration {
    fn from(value: Vec<Vec<&str>>) -> Self {
        KeyDeclaration::Nested(
            value
                .into_iter()
                .map(|inner| inner.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

/// Whether a binding must match by equality or by nearest difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    #[default]
    Exact,
    Fuzzy,
}

/// A validated (left column, right column) pair for one join level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Column in the left dataset.
    pub left: String,
    /// Column in the right dataset.
    pub right: String,
    pub role: KeyRole,
    /// Kind of the left column, resolved from its dtype.
    pub left_kind: ColumnKind,
    /// Kind of the right column, resolved from its dtype.
    pub right_kind: ColumnKind,
}

impl KeyBinding {
    pub fn new(
        left: impl Into<String>,
        right: impl Into<String>,
        left_kind: ColumnKind,
        right_kind: ColumnKind,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            role: KeyRole::Exact,
            left_kind,
            right_kind,
        }
    }

    /// Same binding with a different role.
    #[must_use]
    pub fn with_role(mut self, role: KeyRole) -> Self {
        self.role = role;
        self
    }

    /// True when both sides resolve to the same column kind.
    pub fn kinds_match(&self) -> bool {
        self.left_kind == self.right_kind
    }

    pub fn is_fuzzy(&self) -> bool {
        self.role == KeyRole::Fuzzy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_deserializes_all_shapes() {
        let single: KeyDeclaration = serde_json::from_str("\"id\"").unwrap();
        assert_eq!(single, KeyDeclaration::Single("id".to_string()));

        let list: KeyDeclaration = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(list, KeyDeclaration::from(vec!["a", "b"]));

        let nested: KeyDeclaration = serde_json::from_str("[[\"a\", \"b\"], [\"c\"]]").unwrap();
        assert_eq!(nested, KeyDeclaration::from(vec![vec!["a", "b"], vec!["c"]]));
    }

    #[test]
    fn test_with_role_keeps_columns() {
        let binding = KeyBinding::new("name", "label", ColumnKind::Text, ColumnKind::Text)
            .with_role(KeyRole::Fuzzy);
        assert!(binding.is_fuzzy());
        assert!(binding.kinds_match());
        assert_eq!(binding.left, "name");
        assert_eq!(binding.right, "label");
    }
}
