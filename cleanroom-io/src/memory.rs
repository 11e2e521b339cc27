//! In-memory row adapters.

use crate::adapter::{RowReader, RowWriter};
use crate::{IoError, IoResult};
use cleanroom_types::{Row, TableHeader};
use std::collections::VecDeque;

/// Yields rows from a vector.
#[derive(Debug, Clone)]
pub struct MemoryRowReader {
    header: TableHeader,
    rows: VecDeque<Row>,
}

impl MemoryRowReader {
    pub fn new(header: TableHeader, rows: Vec<Row>) -> Self {
        Self {
            header,
            rows: rows.into(),
        }
    }

    /// Rows not yet read.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowReader for MemoryRowReader {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn has_next(&mut self) -> IoResult<bool> {
        Ok(!self.rows.is_empty())
    }

    fn next_row(&mut self) -> IoResult<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}

/// Collects written rows into a vector.
#[derive(Debug, Clone)]
pub struct MemoryRowWriter {
    header: TableHeader,
    rows: Vec<Row>,
    closed: bool,
}

impl MemoryRowWriter {
    pub fn new(header: TableHeader) -> Self {
        Self {
            header,
            rows: Vec::new(),
            closed: false,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowWriter for MemoryRowWriter {
    fn header(&self) -> &TableHeader {
        &self.header
    }

    fn write_row(&mut self, row: &Row) -> IoResult<()> {
        if self.closed {
            return Err(IoError::Closed);
        }
        if row.width() != self.header.len() {
            return Err(IoError::RowWidth {
                expected: self.header.len(),
                actual: row.width(),
            });
        }
        self.rows.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> IoResult<()> {
        if self.closed {
            return Err(IoError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        self.closed = true;
        Ok(())
    }
}
