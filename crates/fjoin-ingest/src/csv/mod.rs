//! CSV reading and writing.

mod reader;
mod writer;

pub use reader::{
    MAX_CSV_FILE_SIZE, check_file_size, check_file_size_with_limit, read_csv_table,
    validate_dataframe_shape, validate_encoding,
};
pub use writer::write_csv_table;
