//! Monthly acquisition from a statistics provider
//!
//! The full historical range is fetched one calendar month at a time. Each
//! non-empty window is reversed and appended to the staging artifact; empty
//! windows leave no trace in the artifact.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[cfg(feature = "savant")]
pub mod savant;

#[cfg(feature = "savant")]
pub use savant::SavantProvider;

use crate::models::TabularDataset;
use crate::staging::{StagingArtifact, StagingError};

/// Default Savant search endpoint
pub const DEFAULT_SAVANT_URL: &str = "https://baseballsavant.mlb.com/statcast_search/csv";

/// Default location of the Chadwick register data files
pub const DEFAULT_REGISTER_URL: &str =
    "https://raw.githubusercontent.com/chadwickbureau/register/master/data";

/// Error type for provider requests
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// Request to the provider failed or returned an error status
    #[error("Request failed for {context}: {message}")]
    Request { context: String, message: String },

    /// Provider response could not be decoded as delimited text
    #[error("Failed to decode response for {context}: {message}")]
    Decode { context: String, message: String },

    /// Writing the staging artifact failed
    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// External statistics provider
#[async_trait(?Send)]
pub trait StatsProvider {
    /// Rows for the inclusive date range `start..=end` (may be empty)
    async fn fetch_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TabularDataset, AcquisitionError>;

    /// Attributes for each numeric identifier
    async fn reverse_lookup(&self, ids: &[i64]) -> Result<TabularDataset, AcquisitionError>;
}

/// One calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl Window {
    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        let first_day = date.with_day(1).unwrap_or(date);
        let next_month = if first_day.month() == 12 {
            NaiveDate::from_ymd_opt(first_day.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first_day.year(), first_day.month() + 1, 1)
        };
        let last_day = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(first_day);
        Self {
            first_day,
            last_day,
        }
    }

    /// The following month
    pub fn next(&self) -> Option<Self> {
        self.last_day.succ_opt().map(Self::containing)
    }
}

/// Calendar months from the month of `start` through the month of `end`
#[derive(Debug, Clone)]
pub struct MonthWindows {
    next: Option<Window>,
    end: NaiveDate,
}

impl MonthWindows {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let first = Window::containing(start);
        Self {
            next: (first.first_day <= end).then_some(first),
            end,
        }
    }
}

impl Iterator for MonthWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let current = self.next?;
        self.next = current.next().filter(|w| w.first_day <= self.end);
        Some(current)
    }
}

/// Statistics from an acquisition run
#[derive(Debug, Clone, Default)]
pub struct AcquisitionStats {
    /// Windows requested from the provider
    pub windows_fetched: usize,
    /// Windows that returned no rows
    pub windows_empty: usize,
    /// Data rows written to the staging artifact
    pub rows_staged: usize,
    /// Path of the staging artifact
    pub staging_file: PathBuf,
    pub duration: Duration,
}

/// Fetch every month in `start..=end` and write the staging artifact
///
/// The artifact at `path` is truncated first. Windows are requested in
/// ascending order and each non-empty one is appended in reversed provider
/// order.
pub async fn acquire_to_staging(
    provider: &dyn StatsProvider,
    start: NaiveDate,
    end: NaiveDate,
    path: &Path,
) -> Result<AcquisitionStats, AcquisitionError> {
    let started = Instant::now();
    let mut artifact = StagingArtifact::create(path)?;
    let mut stats = AcquisitionStats {
        staging_file: path.to_path_buf(),
        ..Default::default()
    };

    for window in MonthWindows::new(start, end) {
        let rows = provider
            .fetch_window(window.first_day, window.last_day)
            .await?;
        stats.windows_fetched += 1;

        if rows.is_empty() {
            stats.windows_empty += 1;
            tracing::debug!(start = %window.first_day, end = %window.last_day, "empty window");
            continue;
        }

        artifact.append(&rows.reversed())?;
        tracing::info!(
            start = %window.first_day,
            end = %window.last_day,
            rows = rows.len(),
            "window staged"
        );
    }

    stats.rows_staged = artifact.rows_written();
    stats.duration = started.elapsed();
    tracing::info!(
        windows = stats.windows_fetched,
        empty = stats.windows_empty,
        rows = stats.rows_staged,
        path = %path.display(),
        "staging file generated"
    );
    Ok(stats)
}
