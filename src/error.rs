//! Top-level error type for a loader run

use crate::acquisition::AcquisitionError;
use crate::config::ConfigError;
use crate::database::DatabaseError;
use crate::reconcile::ReconcileError;
use crate::staging::StagingError;

/// Any error that aborts the pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Staging(#[from] StagingError),
}

impl From<ReconcileError> for PipelineError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Database(e) => PipelineError::Database(e),
            ReconcileError::Acquisition(e) => PipelineError::Acquisition(e),
        }
    }
}

impl PipelineError {
    /// Error class reported alongside the message on exit
    pub fn classification(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "ConfigError",
            PipelineError::Database(e) => match e {
                DatabaseError::ConnectionFailed(_) => "ConnectionError",
                DatabaseError::ProvisioningFailed(_) => "ProvisioningError",
                DatabaseError::LoadFailed(_) | DatabaseError::IoError(_) => "LoadError",
                DatabaseError::QueryFailed(_) => "QueryError",
                DatabaseError::InvalidIdentifier(_) => "ConfigError",
            },
            PipelineError::Acquisition(AcquisitionError::Staging(_)) => "StagingError",
            PipelineError::Acquisition(_) => "AcquisitionError",
            PipelineError::Staging(_) => "StagingError",
        }
    }
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classification() {
        let cases: Vec<(PipelineError, &str)> = vec![
            (
                DatabaseError::ConnectionFailed("refused".into()).into(),
                "ConnectionError",
            ),
            (
                DatabaseError::ProvisioningFailed("exists".into()).into(),
                "ProvisioningError",
            ),
            (DatabaseError::LoadFailed("eof".into()).into(), "LoadError"),
            (DatabaseError::QueryFailed("syntax".into()).into(), "QueryError"),
            (
                AcquisitionError::Request {
                    context: "window".into(),
                    message: "timeout".into(),
                }
                .into(),
                "AcquisitionError",
            ),
            (
                AcquisitionError::Staging(StagingError::Empty(PathBuf::from("x"))).into(),
                "StagingError",
            ),
            (ConfigError::Parse("bad".into()).into(), "ConfigError"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.classification(), expected, "{}", error);
        }
    }

    #[test]
    fn test_reconcile_errors_keep_their_class() {
        let err: PipelineError =
            ReconcileError::Database(DatabaseError::LoadFailed("x".into())).into();
        assert_eq!(err.classification(), "LoadError");
        assert_eq!(err.to_string(), "Load failed: x");
    }
}
