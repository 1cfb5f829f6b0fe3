//! Dataset ingestion for fuzzy joins.
//!
//! Loads CSV files into Polars DataFrames with size, encoding and header
//! checks, and writes joined results back out as CSV.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use fjoin_ingest::{read_csv_table, write_csv_table};
//!
//! let mut left = read_csv_table(Path::new("left.csv"))?;
//! write_csv_table(&mut left, Path::new("copy.csv"))?;
//! ```

mod csv;
mod error;

// === Error Types ===
pub use error::{IngestError, Result};

// === CSV ===
pub use csv::{
    MAX_CSV_FILE_SIZE, check_file_size, check_file_size_with_limit, read_csv_table,
    validate_dataframe_shape, validate_encoding, write_csv_table,
};
