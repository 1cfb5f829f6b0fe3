//! Round trips through the CSV reader and writer.

use std::io::Write;

use fjoin_ingest::{IngestError, read_csv_table, write_csv_table};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn header_only_file_is_an_empty_dataset() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "name,age\n").unwrap();

    let df = read_csv_table(file.path()).unwrap();
    assert_eq!(df.height(), 0);
    assert_eq!(df.width(), 2);
}

#[test]
fn written_table_reads_back() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "city,pop\nboston,7\nnyc,8\n").unwrap();
    let mut df = read_csv_table(file.path()).unwrap();
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["city", "pop"]);

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("copy.csv");
    write_csv_table(&mut df, &out).unwrap();
    let again = read_csv_table(&out).unwrap();
    assert!(df.equals(&again));
}

#[test]
fn blank_header_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "name, \ncat,1\n").unwrap();

    let result = read_csv_table(file.path());
    assert!(matches!(result, Err(IngestError::EmptyColumnName { .. })));
}
