//! Row adapters for the cleanroom engine.
//!
//! The engine reads and writes rows only through [`RowReader`] and
//! [`RowWriter`]; this crate provides the CSV and in-memory implementations,
//! format detection, and the merge of partitioned output.

mod adapter;
mod csv_file;
mod error;
mod format;
mod memory;
mod merge;

pub use adapter::{RowReader, RowWriter};
pub use csv_file::{CsvOptions, CsvRowReader, CsvRowWriter};
pub use error::{IoError, IoResult};
pub use format::{create_writer, open_reader, FileFormat};
pub use memory::{MemoryRowReader, MemoryRowWriter};
pub use merge::{merge_csv_partitions, merge_partitions, partition_paths};
