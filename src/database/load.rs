//! Bulk load engine
//!
//! Every load goes through the copy protocol. There is no per-row insert
//! path and no deduplication: loading the same rows twice stores them twice.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::schema::copy_from_stdin_sql;
use super::{CopySource, DatabaseError, DatabaseResult, StreamingLoader};
use crate::models::TabularDataset;

/// Bulk loader over a streaming handle
pub struct BulkLoader<'a> {
    loader: &'a dyn StreamingLoader,
}

impl<'a> BulkLoader<'a> {
    /// Create a bulk loader on top of a streaming handle
    pub fn new(loader: &'a dyn StreamingLoader) -> Self {
        Self { loader }
    }

    /// Stream `source` into `namespace.table`
    ///
    /// # Returns
    /// Number of rows copied
    pub async fn bulk_load(
        &self,
        source: CopySource,
        table: &str,
        namespace: &str,
    ) -> DatabaseResult<u64> {
        let statement = copy_from_stdin_sql(table, namespace)?;
        let description = source.describe();
        let start = Instant::now();

        let rows = self
            .loader
            .copy_in(&statement, source)
            .await
            .map_err(|e| match e {
                DatabaseError::LoadFailed(_) | DatabaseError::ConnectionFailed(_) => e,
                other => DatabaseError::LoadFailed(format!("Copy into {} failed: {}", table, other)),
            })?;

        tracing::info!(
            table = %table.to_lowercase(),
            namespace = %namespace.to_lowercase(),
            source = %description,
            rows,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "data inserted"
        );
        Ok(rows)
    }

    /// Load an existing delimited file (header on the first line)
    pub async fn load_file(&self, path: &Path, table: &str, namespace: &str) -> DatabaseResult<u64> {
        self.bulk_load(CopySource::File(path.to_path_buf()), table, namespace)
            .await
    }

    /// Load a dataset, optionally spooling it to `spool` first
    ///
    /// Without a spool path the dataset is materialised into an in-memory
    /// buffer. With one, it is written there (header included, replacing any
    /// previous content) and the file is streamed instead.
    pub async fn load_dataset(
        &self,
        dataset: &TabularDataset,
        table: &str,
        namespace: &str,
        spool: Option<&Path>,
    ) -> DatabaseResult<u64> {
        let source = match spool {
            Some(path) => {
                spool_dataset(dataset, path)?;
                CopySource::File(PathBuf::from(path))
            }
            None => CopySource::from_dataset(dataset)?,
        };
        self.bulk_load(source, table, namespace).await
    }
}

fn spool_dataset(dataset: &TabularDataset, path: &Path) -> DatabaseResult<()> {
    let file = File::create(path).map_err(|e| {
        DatabaseError::IoError(format!("Failed to create {}: {}", path.display(), e))
    })?;
    dataset
        .write_csv(BufWriter::new(file), true)
        .map_err(|e| DatabaseError::IoError(format!("Failed to write {}: {}", path.display(), e)))
}
