//! Identity reconciliation
//!
//! Distinct identifiers from the loaded primary table are resolved through
//! the provider's reverse lookup and loaded as their own table, using the
//! same provisioning and copy primitives as the primary load.

use std::collections::BTreeSet;

use crate::acquisition::{AcquisitionError, StatsProvider};
use crate::database::schema::distinct_union_sql;
use crate::database::{
    BulkLoader, DatabaseError, ExistsPolicy, Provisioner, StreamingLoader, TransactionalStore,
};
use crate::inference::SchemaDescriptor;

/// Where the identity data comes from and where it goes
#[derive(Debug, Clone)]
pub struct ReconcileTarget<'a> {
    /// Primary table holding the identifier columns
    pub source_namespace: &'a str,
    pub source_table: &'a str,
    pub identifier_columns: &'a [String],
    /// Table receiving the lookup result
    pub namespace: &'a str,
    pub table: &'a str,
    pub exists: ExistsPolicy,
}

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Distinct identifiers found in the primary table
    pub distinct_ids: usize,
    /// Rows returned by the reverse lookup
    pub resolved: usize,
    /// Rows copied into the identity table
    pub rows_loaded: u64,
}

/// Error type for reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
}

/// Distinct non-null identifiers across `columns`, ascending
///
/// Values that are not integers are skipped with a warning.
pub async fn distinct_identifiers(
    store: &dyn TransactionalStore,
    columns: &[String],
    table: &str,
    namespace: &str,
) -> Result<Vec<i64>, DatabaseError> {
    let sql = distinct_union_sql(columns, table, namespace)?;
    tracing::debug!(%sql, "collecting identifiers");
    let result = store.query(&sql, &[]).await?;

    let mut ids = BTreeSet::new();
    let mut dropped = 0usize;
    for value in result.rows().iter().filter_map(|row| row.first()) {
        match value.as_i64() {
            Some(id) => {
                ids.insert(id);
            }
            None if !value.is_null() => dropped += 1,
            None => {}
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, table = %table, "non-integer identifiers skipped");
    }
    Ok(ids.into_iter().collect())
}

/// Resolve identifiers and load the result as the identity table
pub async fn reconcile_identities(
    store: &dyn TransactionalStore,
    loader: &dyn StreamingLoader,
    provider: &dyn StatsProvider,
    target: &ReconcileTarget<'_>,
) -> Result<ReconcileStats, ReconcileError> {
    let ids = distinct_identifiers(
        store,
        target.identifier_columns,
        target.source_table,
        target.source_namespace,
    )
    .await?;
    tracing::info!(count = ids.len(), "distinct identifiers collected");

    let identities = provider.reverse_lookup(&ids).await?;
    let descriptor = SchemaDescriptor::infer(&identities);

    Provisioner::new(store)
        .create_table(&descriptor, target.table, target.namespace, target.exists)
        .await?;

    let rows_loaded = if identities.is_empty() {
        0
    } else {
        BulkLoader::new(loader)
            .load_dataset(&identities, target.table, target.namespace, None)
            .await?
    };

    tracing::info!(
        table = %target.table,
        resolved = identities.len(),
        rows = rows_loaded,
        "identities reconciled"
    );
    Ok(ReconcileStats {
        distinct_ids: ids.len(),
        resolved: identities.len(),
        rows_loaded,
    })
}
