//! Merging partitioned output back into one stream.

use crate::adapter::{RowReader, RowWriter};
use crate::csv_file::{CsvOptions, CsvRowReader, CsvRowWriter};
use crate::{IoError, IoResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Paths of `count` partitions under `dir`: `part-00000.<ext>`, ...
pub fn partition_paths(dir: &Path, count: usize, extension: &str) -> Vec<PathBuf> {
    (0..count)
        .map(|i| dir.join(format!("part-{i:05}.{extension}")))
        .collect()
}

/// Concatenates every partition into `writer`, in the order given.
///
/// All partitions must share the writer's header. Returns the number of
/// rows written.
pub fn merge_partitions<R: RowReader>(
    partitions: &mut [R],
    writer: &mut dyn RowWriter,
) -> IoResult<u64> {
    let mut rows = 0u64;
    for (index, partition) in partitions.iter_mut().enumerate() {
        if partition.header() != writer.header() {
            return Err(IoError::SchemaMismatch {
                expected: format!("{:?}", writer.header().columns()),
                actual: format!("{:?}", partition.header().columns()),
            });
        }
        let before = rows;
        while let Some(row) = partition.next_row()? {
            writer.write_row(&row)?;
            rows += 1;
        }
        debug!(partition = index, rows = rows - before, "merged partition");
    }
    writer.flush()?;
    Ok(rows)
}

/// Merges every `*.csv` file in `dir`, in file-name order, into `output`.
pub fn merge_csv_partitions(
    dir: &Path,
    output: &Path,
    options: &CsvOptions,
    overwrite: bool,
) -> IoResult<u64> {
    let entries = std::fs::read_dir(dir).map_err(|source| IoError::Path {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "csv") && path != output {
            paths.push(path);
        }
    }
    paths.sort();

    let mut readers = paths
        .iter()
        .map(|p| CsvRowReader::open(p, options))
        .collect::<IoResult<Vec<_>>>()?;
    let Some(first) = readers.first() else {
        return Err(IoError::Path {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no CSV partitions"),
        });
    };

    let mut writer = CsvRowWriter::create(output, first.header().clone(), options, overwrite)?;
    let rows = merge_partitions(&mut readers, &mut writer)?;
    writer.close()?;
    info!(partitions = paths.len(), rows, output = %output.display(), "merged CSV partitions");
    Ok(rows)
}
