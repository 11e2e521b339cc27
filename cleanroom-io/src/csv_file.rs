//! CSV row adapters.
//!
//! Every cell is read as text; an input field equal to the configured null
//! marker becomes [`Value::Null`]. Interpreting `01:hmac:` / `01:enc:` cells
//! is left to the engine, so the reader never rejects a file because of its
//! contents. Records may have any number of fields; a width that differs
//! from the header is reported per row by the engine.

use crate::adapter::{RowReader, RowWriter};
use crate::{IoError, IoResult};
use cleanroom_types::{Row, TableHeader, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Dialect options shared by the CSV reader and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Input fields equal to this are read as null.
    pub input_null_value: String,
    /// Nulls are written as this.
    pub output_null_value: String,
    /// Accept a header row that names a column more than once.
    pub allow_duplicate_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            input_null_value: String::new(),
            output_null_value: String::new(),
            allow_duplicate_headers: false,
        }
    }
}

/// Reads rows from CSV with a mandatory header row.
pub struct CsvRowReader<R: Read> {
    inner: csv::Reader<R>,
    header: TableHeader,
    null_value: String,
    record: csv::StringRecord,
    pending: Option<Row>,
    exhausted: bool,
}

impl CsvRowReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, options: &CsvOptions) -> IoResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IoError::Path {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = Self::from_reader(BufReader::new(file), options)?;
        debug!(path = %path.display(), columns = reader.header.len(), "opened CSV input");
        Ok(reader)
    }
}

impl<R: Read> CsvRowReader<R> {
    pub fn from_reader(reader: R, options: &CsvOptions) -> IoResult<Self> {
        let mut inner = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let names = inner.headers()?.clone();
        if names.is_empty() {
            return Err(IoError::MissingHeader);
        }
        let header = TableHeader::from_names(names.iter())?;
        if !options.allow_duplicate_headers {
            if let Some(dup) = header.first_duplicate() {
                return Err(IoError::DuplicateHeader(dup.to_string()));
            }
        }

        Ok(Self {
            inner,
            header,
            null_value: options.input_null_value.clone(),
            record: csv::StringRecord::new(),
            pending: None,
            exhausted: false,
        })
    }

    fn fill(&mut self) -> IoResult<()> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }
        if !self.inner.read_record(&mut self.record)? {
            self.exhausted = true;
            return Ok(());
        }
        let row = self
            .record
            .iter()
            .map(|field| {
                if field == self.null_value {
                    Value::Null
                } else {
                    Value::text(field)
                }
            })
            .collect();
        self.pending = Some(row);
        Ok(())
    }
}

impl<R: Read> RowReader for CsvRowReader<R> {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn has_next(&mut self) -> IoResult<bool> {
        self.fill()?;
        Ok(self.pending.is_some())
    }

    fn next_row(&mut self) -> IoResult<Option<Row>> {
        self.fill()?;
        Ok(self.pending.take())
    }
}

/// Writes rows as CSV, header row first.
pub struct CsvRowWriter<W: Write> {
    inner: Option<csv::Writer<W>>,
    header: TableHeader,
    null_value: String,
}

impl CsvRowWriter<BufWriter<File>> {
    /// Creates `path`, refusing to replace an existing file unless `overwrite`.
    pub fn create(
        path: impl AsRef<Path>,
        header: TableHeader,
        options: &CsvOptions,
        overwrite: bool,
    ) -> IoResult<Self> {
        let path = path.as_ref();
        if path.exists() && !overwrite {
            return Err(IoError::OutputExists(path.to_path_buf()));
        }
        let file = File::create(path).map_err(|source| IoError::Path {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), columns = header.len(), "created CSV output");
        Self::from_writer(BufWriter::new(file), header, options)
    }
}

impl<W: Write> CsvRowWriter<W> {
    pub fn from_writer(writer: W, header: TableHeader, options: &CsvOptions) -> IoResult<Self> {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);
        inner.write_record(header.iter().map(|c| c.as_str()))?;
        Ok(Self {
            inner: Some(inner),
            header,
            null_value: options.output_null_value.clone(),
        })
    }

    /// Closes the writer and hands back the underlying sink.
    pub fn into_inner(mut self) -> IoResult<W> {
        let inner = self.inner.take().ok_or(IoError::Closed)?;
        inner.into_inner().map_err(|e| IoError::Io(e.into_error()))
    }
}

impl<W: Write> RowWriter for CsvRowWriter<W> {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn write_row(&mut self, row: &Row) -> IoResult<()> {
        let inner = self.inner.as_mut().ok_or(IoError::Closed)?;
        if row.width() != self.header.len() {
            return Err(IoError::RowWidth {
                expected: self.header.len(),
                actual: row.width(),
            });
        }
        let fields: Vec<String> = row
            .iter()
            .map(|v| v.to_text().unwrap_or_else(|| self.null_value.clone()))
            .collect();
        inner.write_record(&fields)?;
        Ok(())
    }

    fn flush(&mut self) -> IoResult<()> {
        let inner = self.inner.as_mut().ok_or(IoError::Closed)?;
        inner.flush()?;
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        if let Some(mut inner) = self.inner.take() {
            inner.flush()?;
        }
        Ok(())
    }
}
