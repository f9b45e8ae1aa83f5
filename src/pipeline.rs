//! Stage orchestration
//!
//! A run is strictly sequential:
//! acquisition -> staging file -> sampled inference -> table provisioning
//! -> bulk load -> identity reconciliation. The first error ends the run;
//! nothing is retried or resumed.

use chrono::NaiveDate;
use rand::Rng;
use std::time::{Duration, Instant};

use crate::acquisition::{AcquisitionStats, StatsProvider, acquire_to_staging};
use crate::config::{Credentials, LoaderConfig};
use crate::database::provision::TableProvision;
use crate::database::{
    BulkLoader, ConnectionManager, Provisioner, StreamingLoader, TransactionalStore,
};
use crate::error::PipelineResult;
use crate::inference::SchemaDescriptor;
use crate::reconcile::{ReconcileStats, ReconcileTarget, reconcile_identities};
use crate::staging::infer_from_staging;

/// Summary of the database side of a run
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Descriptor the primary table was created from
    pub descriptor: SchemaDescriptor,
    pub table: TableProvision,
    /// Rows copied into the primary table
    pub rows_loaded: u64,
    pub identities: ReconcileStats,
}

/// Summary of a full run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub acquisition: AcquisitionStats,
    pub columns: usize,
    pub sampled_rows: usize,
    pub rows_loaded: u64,
    pub identities_loaded: u64,
    pub duration: Duration,
}

impl PipelineReport {
    fn new(acquisition: AcquisitionStats, load: &LoadReport, duration: Duration) -> Self {
        Self {
            acquisition,
            columns: load.descriptor.len(),
            sampled_rows: load.descriptor.sampled_rows,
            rows_loaded: load.rows_loaded,
            identities_loaded: load.identities.rows_loaded,
            duration,
        }
    }
}

/// Fetch the configured range through `today` into the staging file
pub async fn acquire(
    config: &LoaderConfig,
    provider: &dyn StatsProvider,
    today: NaiveDate,
) -> PipelineResult<AcquisitionStats> {
    let stats = acquire_to_staging(
        provider,
        config.acquisition.start_date,
        today,
        &config.acquisition.staging_file,
    )
    .await?;
    Ok(stats)
}

/// Create the target database through an administrative connection
pub async fn create_target_database(
    config: &LoaderConfig,
    admin: &dyn TransactionalStore,
) -> PipelineResult<()> {
    Provisioner::new(admin)
        .create_database(&config.database.target_database)
        .await?;
    Ok(())
}

/// Provision, load and reconcile inside the target database
///
/// Expects the staging file to be complete. The primary table is created
/// from a uniform sample of the whole file, then the whole file is copied.
pub async fn load_staged<R: Rng + ?Sized>(
    config: &LoaderConfig,
    store: &dyn TransactionalStore,
    loader: &dyn StreamingLoader,
    provider: &dyn StatsProvider,
    rng: &mut R,
) -> PipelineResult<LoadReport> {
    let load = &config.load;
    let staging_file = config.acquisition.staging_file.as_path();
    let provisioner = Provisioner::new(store);

    let mut namespaces = vec![load.namespace.as_str()];
    if load.identity_namespace.to_lowercase() != load.namespace.to_lowercase() {
        namespaces.push(load.identity_namespace.as_str());
    }
    provisioner.create_schemas(&namespaces).await?;

    let descriptor = infer_from_staging(staging_file, load.sample_size, rng)?;
    let table = provisioner
        .create_table(&descriptor, &load.table, &load.namespace, load.table_exists)
        .await?;
    tracing::info!("table created from random sample");

    let rows_loaded = BulkLoader::new(loader)
        .load_file(staging_file, &load.table, &load.namespace)
        .await?;

    let target = ReconcileTarget {
        source_namespace: &load.namespace,
        source_table: &load.table,
        identifier_columns: &load.identifier_columns,
        namespace: &load.identity_namespace,
        table: &load.identity_table,
        exists: load.identity_table_exists,
    };
    let identities = reconcile_identities(store, loader, provider, &target).await?;

    Ok(LoadReport {
        descriptor,
        table,
        rows_loaded,
        identities,
    })
}

/// Run every stage against a live server
pub async fn run(
    config: &LoaderConfig,
    credentials: &Credentials,
    provider: &dyn StatsProvider,
    today: NaiveDate,
) -> PipelineResult<PipelineReport> {
    let started = Instant::now();
    let acquisition = acquire(config, provider, today).await?;

    {
        let admin = ConnectionManager::connect(config.admin_params(credentials)).await?;
        create_target_database(config, &admin).await?;
    }

    let target = ConnectionManager::connect(config.target_params(credentials)).await?;
    let mut rng = rand::thread_rng();
    let load = load_staged(config, &target, &target, provider, &mut rng).await?;

    let report = PipelineReport::new(acquisition, &load, started.elapsed());
    tracing::info!(
        rows = report.rows_loaded,
        identities = report.identities_loaded,
        elapsed_s = report.duration.as_secs(),
        "pipeline complete"
    );
    Ok(report)
}
