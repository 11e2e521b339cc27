//! The run driver: reads batches, marshals them in parallel, writes in order.

use crate::error::{EngineError, EngineResult, RowError};
use crate::marshaller::Marshaller;
use crate::session::Session;
use cleanroom_io::{IoResult, RowReader, RowWriter};
use cleanroom_schema::{Mode, Schema};
use cleanroom_types::{CollaborationId, Row, TableHeader};
use std::thread;
use tracing::{debug, info, warn};

/// Default number of rows read per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// What to do with a row that fails with a non-fatal [`RowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowErrorPolicy {
    /// Stop the run.
    #[default]
    Abort,
    /// Record the failure in the [`RunReport`], skip the row and continue.
    Collect,
}

/// Tuning and behaviour knobs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Worker threads per batch.
    pub parallelism: usize,
    pub batch_size: usize,
    pub row_errors: RowErrorPolicy,
    /// Resolve and validate everything, process no rows.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            batch_size: DEFAULT_BATCH_SIZE,
            row_errors: RowErrorPolicy::Abort,
            dry_run: false,
        }
    }
}

fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map_or(4, |n| n.get().max(1))
        .min(64)
}

/// A row that was skipped under [`RowErrorPolicy::Collect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// Zero-based position in the input.
    pub row_index: u64,
    pub error: RowError,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rows_read: u64,
    pub rows_written: u64,
    pub batches: u64,
    pub failures: Vec<RowFailure>,
}

impl RunReport {
    /// Every row read was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.rows_read == self.rows_written
    }
}

/// A prepared run: validated schema, bound marshaller, keys and options.
#[derive(Debug)]
pub struct Engine {
    collaboration_id: CollaborationId,
    marshaller: Marshaller,
    options: RunOptions,
}

impl Engine {
    /// Validates `schema` under the session's policy and binds it to the
    /// header of the input about to be processed.
    ///
    /// Every configuration error surfaces here, before any row is read. A
    /// session with a locally supplied policy is only accepted for dry runs.
    pub fn prepare(
        session: &Session,
        schema: &Schema,
        mode: Mode,
        input_header: &TableHeader,
        options: RunOptions,
    ) -> EngineResult<Self> {
        if !options.dry_run && !session.policy().is_enforceable() {
            return Err(EngineError::config(
                "locally supplied settings can only be used for a dry run; \
                 real runs need the collaboration's settings",
            ));
        }
        if options.parallelism == 0 {
            return Err(EngineError::config("parallelism must be at least 1"));
        }
        if options.batch_size == 0 {
            return Err(EngineError::config("batch size must be at least 1"));
        }

        let validated = schema.validate(session.settings(), mode)?;
        let marshaller =
            Marshaller::new(&validated, input_header, session.keys(), session.settings())?;

        Ok(Self {
            collaboration_id: *session.collaboration_id(),
            marshaller,
            options,
        })
    }

    pub fn marshaller(&self) -> &Marshaller {
        &self.marshaller
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Header the output writer must carry.
    pub fn output_header(&self) -> &TableHeader {
        self.marshaller.output_header()
    }

    /// Transforms every row of `reader` into `writer`, preserving input order.
    pub fn run(
        &self,
        reader: &mut dyn RowReader,
        writer: &mut dyn RowWriter,
    ) -> EngineResult<RunReport> {
        self.check_writer(&*writer)?;
        let report = self.drive(reader, |_, row| writer.write_row(row))?;
        writer.flush()?;
        Ok(report)
    }

    /// Like [`run`](Self::run), but writes batch `k` to `writers[k % N]`.
    ///
    /// Order holds within each partition only. Concatenating the partitions
    /// yields exactly the rows a plain run would have written.
    pub fn run_partitioned<W: RowWriter>(
        &self,
        reader: &mut dyn RowReader,
        writers: &mut [W],
    ) -> EngineResult<RunReport> {
        if writers.is_empty() {
            return Err(EngineError::config("at least one partition is required"));
        }
        for writer in writers.iter() {
            self.check_writer(writer)?;
        }
        let count = writers.len() as u64;
        let report = self.drive(reader, |batch, row| {
            writers[(batch % count) as usize].write_row(row)
        })?;
        for writer in writers.iter_mut() {
            writer.flush()?;
        }
        Ok(report)
    }

    fn check_writer<W: RowWriter + ?Sized>(&self, writer: &W) -> EngineResult<()> {
        if writer.header() != self.output_header() {
            return Err(EngineError::config(
                "output header does not match the schema's target columns",
            ));
        }
        Ok(())
    }

    fn drive<F>(&self, reader: &mut dyn RowReader, mut write: F) -> EngineResult<RunReport>
    where
        F: FnMut(u64, &Row) -> IoResult<()>,
    {
        let mut report = RunReport::default();
        if self.options.dry_run {
            info!(collaboration = %self.collaboration_id, "dry run: no rows processed");
            return Ok(report);
        }
        if reader.header() != self.marshaller.input_header() {
            return Err(EngineError::config(
                "input header does not match the header the schema was bound to",
            ));
        }

        info!(
            collaboration = %self.collaboration_id,
            mode = ?self.marshaller.mode(),
            parallelism = self.options.parallelism,
            batch_size = self.options.batch_size,
            "run started"
        );

        loop {
            let batch = read_batch(reader, self.options.batch_size)?;
            if batch.is_empty() {
                break;
            }
            let first_index = report.rows_read;
            let batch_index = report.batches;
            report.rows_read += batch.len() as u64;
            report.batches += 1;

            let results = self.marshal_batch(&batch)?;
            for (offset, result) in results.into_iter().enumerate() {
                let row_index = first_index + offset as u64;
                match result {
                    Ok(row) => {
                        write(batch_index, &row)?;
                        report.rows_written += 1;
                    }
                    Err(error) => self.on_row_error(&mut report, row_index, error)?,
                }
            }
            debug!(batch = batch_index, rows = batch.len(), "batch written");
        }

        info!(
            rows_read = report.rows_read,
            rows_written = report.rows_written,
            rows_failed = report.failures.len(),
            "run finished"
        );
        Ok(report)
    }

    fn on_row_error(
        &self,
        report: &mut RunReport,
        row_index: u64,
        error: RowError,
    ) -> EngineResult<()> {
        if error.is_fatal() || self.options.row_errors == RowErrorPolicy::Abort {
            return Err(EngineError::Row {
                row_index,
                source: error,
            });
        }
        warn!(row = row_index, %error, "row skipped");
        report.failures.push(RowFailure { row_index, error });
        Ok(())
    }

    /// Marshals a batch on up to `parallelism` scoped threads, results in
    /// input order.
    fn marshal_batch(&self, batch: &[Row]) -> EngineResult<Vec<Result<Row, RowError>>> {
        let workers = self.options.parallelism.min(batch.len()).max(1);
        if workers == 1 {
            return Ok(batch.iter().map(|row| self.marshaller.marshal(row)).collect());
        }

        let chunk_size = batch.len().div_ceil(workers);
        let marshaller = &self.marshaller;
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|row| marshaller.marshal(row))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(batch.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => results.extend(chunk),
                    Err(_) => return Err(EngineError::WorkerPanicked),
                }
            }
            Ok(results)
        })
    }
}

fn read_batch(reader: &mut dyn RowReader, size: usize) -> IoResult<Vec<Row>> {
    let mut batch = Vec::with_capacity(size);
    while batch.len() < size && reader.has_next()? {
        if let Some(row) = reader.next_row()? {
            batch.push(row);
        }
    }
    Ok(batch)
}
