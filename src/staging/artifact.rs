//! Staging artifact writer
//!
//! The artifact is a comma-delimited UTF-8 file holding every acquired row.
//! It is truncated once at the start of a run and then only appended to; the
//! header is written with the first non-empty chunk and never again.

use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::StagingError;
use crate::models::TabularDataset;

/// Append-only, header-once writer for the staging artifact
#[derive(Debug)]
pub struct StagingArtifact {
    path: PathBuf,
    columns: Option<Vec<String>>,
    rows_written: usize,
    chunks_written: usize,
}

impl StagingArtifact {
    /// Start a fresh artifact at `path`, truncating any previous run's content
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let path = path.into();
        File::create(&path).map_err(|e| StagingError::io(&path, e))?;
        Ok(Self {
            path,
            columns: None,
            rows_written: 0,
            chunks_written: 0,
        })
    }

    /// Append one chunk of rows
    ///
    /// Empty chunks are ignored entirely: nothing is written and the header
    /// state does not change.
    pub fn append(&mut self, chunk: &TabularDataset) -> Result<(), StagingError> {
        if chunk.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| StagingError::io(&self.path, e))?;

        let writer = BufWriter::new(file);
        match &self.columns {
            None => {
                chunk
                    .write_csv(writer, true)
                    .map_err(|e| StagingError::csv(&self.path, e))?;
                self.columns = Some(chunk.columns().to_vec());
            }
            Some(columns) if columns.as_slice() == chunk.columns() => chunk
                .write_csv(writer, false)
                .map_err(|e| StagingError::csv(&self.path, e))?,
            Some(columns) => {
                tracing::debug!("realigning chunk columns to staging header");
                TabularDataset::empty(columns.clone())
                    .concat(chunk)
                    .write_csv(writer, false)
                    .map_err(|e| StagingError::csv(&self.path, e))?
            }
        }

        self.rows_written += chunk.len();
        self.chunks_written += 1;
        Ok(())
    }

    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows appended so far (header excluded)
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Non-empty chunks appended so far
    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }

    /// Whether the header has been written
    pub fn has_header(&self) -> bool {
        self.columns.is_some()
    }

    /// Header columns, once the first non-empty chunk has been written
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }
}
