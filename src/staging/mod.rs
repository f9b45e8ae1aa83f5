//! Staging area for acquired rows
//!
//! Acquired pitch rows are appended to a single delimited file before they
//! reach the database. The same file feeds both schema inference (through a
//! uniform row sample) and the bulk load.
//!
//! ## Example
//!
//! ```rust,ignore
//! use statcast_loader::staging::{StagingArtifact, infer_from_staging};
//!
//! let mut artifact = StagingArtifact::create(".statcast.csv")?;
//! artifact.append(&window_rows)?;
//!
//! let descriptor = infer_from_staging(artifact.path(), 10_000, &mut rand::thread_rng())?;
//! ```

use std::path::{Path, PathBuf};

mod artifact;
mod sample;

pub use artifact::StagingArtifact;
pub use sample::{
    DEFAULT_SAMPLE_SIZE, count_data_rows, infer_from_staging, read_sample, skip_indices,
};

/// Error type for staging file operations
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Reading or writing the staging file failed
    #[error("IO error on {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The staging file is not valid delimited text
    #[error("CSV error on {}: {error}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        error: csv::Error,
    },

    /// The staging file has no header row
    #[error("Staging file {} is empty", .0.display())]
    Empty(PathBuf),
}

impl StagingError {
    pub(crate) fn io(path: &Path, error: std::io::Error) -> Self {
        StagingError::Io {
            path: path.to_path_buf(),
            error,
        }
    }

    pub(crate) fn csv(path: &Path, error: csv::Error) -> Self {
        StagingError::Csv {
            path: path.to_path_buf(),
            error,
        }
    }
}
