//! File format selection and adapter construction.

use crate::adapter::{RowReader, RowWriter};
use crate::csv_file::{CsvOptions, CsvRowReader, CsvRowWriter};
use crate::{IoError, IoResult};
use cleanroom_types::TableHeader;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
}

impl FileFormat {
    /// Infers the format from a file extension.
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| IoError::UnknownFormat(path.display().to_string()))?;
        ext.parse()
    }

    /// Uses `explicit` when given, otherwise infers from `path`.
    pub fn resolve(explicit: Option<FileFormat>, path: &Path) -> IoResult<Self> {
        match explicit {
            Some(format) => Ok(format),
            None => Self::from_path(path),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
        }
    }
}

impl FromStr for FileFormat {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            other => Err(IoError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Opens `path` for reading.
pub fn open_reader(
    path: &Path,
    format: FileFormat,
    options: &CsvOptions,
) -> IoResult<Box<dyn RowReader>> {
    match format {
        FileFormat::Csv => Ok(Box::new(CsvRowReader::open(path, options)?)),
    }
}

/// Creates `path` for writing rows with `header`.
pub fn create_writer(
    path: &Path,
    header: TableHeader,
    format: FileFormat,
    options: &CsvOptions,
    overwrite: bool,
) -> IoResult<Box<dyn RowWriter>> {
    match format {
        FileFormat::Csv => Ok(Box::new(CsvRowWriter::create(
            path, header, options, overwrite,
        )?)),
    }
}
