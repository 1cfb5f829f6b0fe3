//! Loading join configurations from disk and running them over CSV files.

use std::fs;

use fjoin_cli::config::{JoinConfig, LevelOverrides};
use fjoin_ingest::{read_csv_table, write_csv_table};
use fjoin_model::{JoinHow, KeyDeclaration};
use tempfile::tempdir;

#[test]
fn load_config_and_join_csv_files() {
    let dir = tempdir().unwrap();
    let left_path = dir.path().join("left.csv");
    let right_path = dir.path().join("right.csv");
    let config_path = dir.path().join("join.json");
    let output_path = dir.path().join("out").join("joined.csv");

    fs::write(&left_path, "region,year,sales\nnorth,2001,10\nnorth,2004,20\nsouth,2003,30\n")
        .unwrap();
    fs::write(&right_path, "region,yr,rate\nnorth,2000,1\nnorth,2005,2\nsouth,2010,3\n").unwrap();
    fs::write(
        &config_path,
        r#"{
            "exact_keys": "region",
            "fuzzy_keys": [["year", "yr"]],
            "exact_how": "left",
            "levels": {"0": {"direction": "backward"}}
        }"#,
    )
    .unwrap();

    let config = JoinConfig::load(&config_path).unwrap();
    assert_eq!(config.exact_how, JoinHow::Left);

    let left = read_csv_table(&left_path).unwrap();
    let right = read_csv_table(&right_path).unwrap();
    let mut join = config.builder(left, right).unwrap().build().unwrap();
    let mut result = join.join(false).unwrap();

    assert_eq!(result.row_count(), 3);
    assert_eq!(result.levels.len(), 1);
    // 2001 -> 2000 and 2004 -> 2000; south has no earlier year.
    assert_eq!(result.levels[0].groups, 2);
    assert!(!result.has_duplicates());

    write_csv_table(&mut result.frame, &output_path).unwrap();
    let written = read_csv_table(&output_path).unwrap();
    assert_eq!(written.height(), 3);
    assert!(
        written
            .get_column_names()
            .iter()
            .all(|name| !name.starts_with("__"))
    );
}

#[test]
fn missing_config_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let error = JoinConfig::load(&path).unwrap_err();
    assert!(format!("{error:#}").contains("absent.json"));
}

#[test]
fn command_line_keys_replace_file_keys() {
    let mut config = JoinConfig {
        fuzzy_keys: Some(KeyDeclaration::from(vec![vec!["a", "b"], vec!["c", "d"]])),
        by_dataset: true,
        ..JoinConfig::default()
    };
    config.apply_overrides(
        None,
        Some(KeyDeclaration::from(vec!["name"])),
        None,
        &LevelOverrides {
            differences: vec!["jaro_winkler".to_string()],
            ..LevelOverrides::default()
        },
    )
    .unwrap();
    assert!(!config.by_dataset);
    assert_eq!(config.fuzzy_level_count(), 1);
    assert_eq!(config.levels[&0].differences, vec!["jaro_winkler".to_string()]);
}

#[test]
fn exact_flag_cannot_reinterpret_per_dataset_fuzzy_keys() {
    let mut config = JoinConfig {
        fuzzy_keys: Some(KeyDeclaration::from(vec![vec!["name"], vec!["full_name"]])),
        by_dataset: true,
        ..JoinConfig::default()
    };
    assert_eq!(config.fuzzy_level_count(), 1);

    let error = config
        .apply_overrides(
            Some(KeyDeclaration::from(vec!["id"])),
            None,
            None,
            &LevelOverrides::default(),
        )
        .unwrap_err();
    assert!(error.to_string().contains("per dataset"));
    assert!(config.by_dataset);
    assert_eq!(config.exact_keys, None);
    assert_eq!(config.fuzzy_level_count(), 1);

    // Replacing both key sets reads them per level.
    config
        .apply_overrides(
            Some(KeyDeclaration::from(vec!["id"])),
            Some(KeyDeclaration::from(vec![vec!["name", "full_name"]])),
            None,
            &LevelOverrides::default(),
        )
        .unwrap();
    assert!(!config.by_dataset);
    assert_eq!(config.fuzzy_level_count(), 1);
}
