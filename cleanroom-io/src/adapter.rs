//! The row source/sink interface the engine is written against.

use crate::IoResult;
use cleanroom_types::{Row, TableHeader};

/// A source of rows sharing one header.
pub trait RowReader {
    /// Column names of every row this reader yields.
    fn header(&self) -> &TableHeader;

    /// Whether another row is available.
    fn has_next(&mut self) -> IoResult<bool>;

    /// The next row, or `None` at end of input.
    fn next_row(&mut self) -> IoResult<Option<Row>>;
}

/// A sink of rows sharing one header.
///
/// Once [`close`](RowWriter::close) has been called every further write
/// fails with [`IoError::Closed`](crate::IoError::Closed).
pub trait RowWriter {
    fn header(&self) -> &TableHeader;

    fn write_row(&mut self, row: &Row) -> IoResult<()>;

    fn flush(&mut self) -> IoResult<()>;

    /// Flushes and releases the sink. Closing twice is a no-op.
    fn close(&mut self) -> IoResult<()>;
}

impl<T: RowReader + ?Sized> RowReader for Box<T> {
    fn header(&self) -> &TableHeader {
        (**self).header()
    }

    fn has_next(&mut self) -> IoResult<bool> {
        (**self).has_next()
    }

    fn next_row(&mut self) -> IoResult<Option<Row>> {
        (**self).next_row()
    }
}

impl<T: RowWriter + ?Sized> RowWriter for Box<T> {
    fn header(&self) -> &TableHeader {
        (**self).header()
    }

    fn write_row(&mut self, row: &Row) -> IoResult<()> {
        (**self).write_row(row)
    }

    fn flush(&mut self) -> IoResult<()> {
        (**self).flush()
    }

    fn close(&mut self) -> IoResult<()> {
        (**self).close()
    }
}
