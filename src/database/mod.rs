//! PostgreSQL access for provisioning and bulk loading
//!
//! This module exposes the database through two capability traits that are
//! both obtainable from one [`ConnectionManager`]:
//! - [`TransactionalStore`]: pooled handle for DDL, DML and queries
//! - [`StreamingLoader`]: dedicated raw session for the `COPY ... FROM STDIN`
//!   protocol, opened and released within each call
//!
//! The [`Provisioner`] and [`BulkLoader`] are written against the traits, so
//! they can run against any backend that honours the same contracts.

use async_trait::async_trait;
use std::path::PathBuf;

pub mod load;
pub mod postgres;
pub mod provision;
pub mod schema;

pub use load::BulkLoader;
pub use postgres::{ConnectionManager, ConnectionParams, StreamingSession};
pub use provision::{ExistsPolicy, Provisioner, TableProvision};

use crate::models::TabularDataset;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to establish a pooled or raw connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// DDL statement failed (existing object, privileges, incompatible table)
    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    /// Bulk copy failed mid-stream
    #[error("Load failed: {0}")]
    LoadFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Identifier cannot be used as a database object name
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// IO error while preparing copy input
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Input for a bulk copy
///
/// Both variants must contain delimited text whose first line is the header,
/// because the copy statement declares `HEADER`.
#[derive(Debug, Clone)]
pub enum CopySource {
    /// Delimited text already materialised in memory
    Buffer(Vec<u8>),
    /// Path to an existing delimited file
    File(PathBuf),
}

impl CopySource {
    /// Materialise a dataset (with header) into an in-memory buffer
    pub fn from_dataset(dataset: &TabularDataset) -> DatabaseResult<Self> {
        dataset
            .to_csv_bytes()
            .map(CopySource::Buffer)
            .map_err(|e| DatabaseError::IoError(format!("Failed to buffer dataset: {}", e)))
    }

    /// Short description for logging
    pub fn describe(&self) -> String {
        match self {
            CopySource::Buffer(buf) => format!("buffer ({} bytes)", buf.len()),
            CopySource::File(path) => format!("file {}", path.display()),
        }
    }
}

/// Transactional handle for DDL, DML and query execution
#[async_trait(?Send)]
pub trait TransactionalStore {
    /// Execute one statement in autocommit mode, outside any transaction block
    ///
    /// # Returns
    /// Number of rows affected
    async fn execute(&self, sql: &str) -> DatabaseResult<u64>;

    /// Execute statements in order inside a single transaction
    ///
    /// Either every statement is committed or none is.
    async fn execute_in_transaction(&self, statements: &[String]) -> DatabaseResult<()>;

    /// Run a query with text parameters (`$1`, `$2`, ...) and collect the rows
    async fn query(&self, sql: &str, params: &[&str]) -> DatabaseResult<TabularDataset>;
}

/// Raw streaming handle for the bulk copy protocol
#[async_trait(?Send)]
pub trait StreamingLoader {
    /// Stream `source` through a `COPY ... FROM STDIN` statement and commit
    ///
    /// The session backing the copy is released before this returns, on
    /// success and on failure alike.
    ///
    /// # Returns
    /// Number of rows copied
    async fn copy_in(&self, statement: &str, source: CopySource) -> DatabaseResult<u64>;
}
