//! Preview rows for a text level.

use fjoin_cli::config::JoinConfig;
use fjoin_cli::types::PreviewOutcome;
use fjoin_model::KeyDeclaration;
use polars::prelude::*;

fn names(values: &[&str]) -> DataFrame {
    DataFrame::new(vec![Series::new("name".into(), values.to_vec()).into()]).unwrap()
}

#[test]
fn preview_rows_snapshot() {
    let config = JoinConfig {
        fuzzy_keys: Some(KeyDeclaration::from("name")),
        ..JoinConfig::default()
    };
    let join = config
        .builder(names(&["dog", "cat"]), names(&["cut", "dog", "bat", "cats"]))
        .unwrap()
        .build()
        .unwrap();

    let outcome = PreviewOutcome {
        level: 0,
        left_column: "name".to_string(),
        right_column: "name".to_string(),
        resolved: join.preview_level(0, 0).unwrap(),
    };
    let rows = outcome.rows();
    assert!(join.resolved_level(0).is_none());
    insta::assert_json_snapshot!("preview_rows", rows);
}

#[test]
fn preview_sample_caps_left_values() {
    let config = JoinConfig {
        fuzzy_keys: Some(KeyDeclaration::from("name")),
        ..JoinConfig::default()
    };
    let join = config
        .builder(names(&["dog", "cat", "cow"]), names(&["dog", "cat"]))
        .unwrap()
        .build()
        .unwrap();

    let resolved = join.preview_level(0, 1).unwrap();
    assert_eq!(resolved.groups.len(), 1);
    assert!(join.preview_level(3, 0).is_err());
}
