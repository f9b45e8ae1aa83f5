//! HTTP statistics provider
//!
//! Pitch-level rows come from the Baseball Savant search CSV endpoint. The
//! endpoint caps each response, so a window is requested in day-sized
//! ranges whose results are joined in request order. Identity reverse lookups go through the Chadwick
//! Bureau register, which is split across sixteen `people-<hex>.csv` files.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

use super::{AcquisitionError, StatsProvider};
use crate::models::TabularDataset;
use crate::models::value::DATE_FORMAT;

/// Columns returned by a reverse lookup
pub const LOOKUP_COLUMNS: [&str; 8] = [
    "name_last",
    "name_first",
    "key_mlbam",
    "key_retro",
    "key_bbref",
    "key_fangraphs",
    "mlb_played_first",
    "mlb_played_last",
];

const REGISTER_SHARDS: &str = "0123456789abcdef";

/// Days covered by one search request
pub const DAYS_PER_REQUEST: u64 = 1;

/// Row count at which the search endpoint truncates a response
pub const SEARCH_ROW_CAP: usize = 25_000;

/// Provider backed by Baseball Savant and the Chadwick register
#[derive(Debug, Clone)]
pub struct SavantProvider {
    client: Client,
    search_url: String,
    register_url: String,
}

impl SavantProvider {
    /// Create a provider for the given endpoints
    pub fn new(
        search_url: impl Into<String>,
        register_url: impl Into<String>,
    ) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(concat!("statcast-loader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquisitionError::Request {
                context: "client setup".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            search_url: search_url.into(),
            register_url: register_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn search_query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("all", "true".to_string()),
            ("hfGT", "R|PO|S|".to_string()),
            ("player_type", "pitcher".to_string()),
            ("game_date_gt", start.format(DATE_FORMAT).to_string()),
            ("game_date_lt", end.format(DATE_FORMAT).to_string()),
            ("min_pitches", "0".to_string()),
            ("min_results", "0".to_string()),
            ("group_by", "name".to_string()),
            ("sort_col", "pitches".to_string()),
            ("player_event_sort", "h_launch_speed".to_string()),
            ("sort_order", "desc".to_string()),
            ("min_abs", "0".to_string()),
            ("type", "details".to_string()),
        ]
    }

    async fn get_csv(
        &self,
        url: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<TabularDataset, AcquisitionError> {
        let request_error = |message: String| AcquisitionError::Request {
            context: context.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(request_error(format!("status {}: {}", status, text)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(e.to_string()))?;
        decode_csv(&body, context)
    }
}

/// Consecutive inclusive date ranges of at most `days` days covering `start..=end`
fn request_ranges(start: NaiveDate, end: NaiveDate, days: u64) -> Vec<(NaiveDate, NaiveDate)> {
    let span = Days::new(days.max(1) - 1);
    let mut ranges = Vec::new();
    let mut from = start;
    while from <= end {
        let to = from.checked_add_days(span).map_or(end, |d| d.min(end));
        ranges.push((from, to));
        match to.succ_opt() {
            Some(next) => from = next,
            None => break,
        }
    }
    ranges
}

/// Parse a CSV response body, tolerating a byte-order mark and blank bodies
fn decode_csv(body: &str, context: &str) -> Result<TabularDataset, AcquisitionError> {
    let body = body.trim_start_matches('\u{feff}');
    if body.trim().is_empty() {
        return Ok(TabularDataset::default());
    }
    TabularDataset::from_csv_reader(body.as_bytes()).map_err(|e| AcquisitionError::Decode {
        context: context.to_string(),
        message: e.to_string(),
    })
}

/// Keep register rows whose `key_mlbam` is in `ids`, projected to [`LOOKUP_COLUMNS`]
fn filter_register(shard: &TabularDataset, ids: &HashSet<i64>) -> TabularDataset {
    let Some(key) = shard.column_index("key_mlbam") else {
        return TabularDataset::empty(LOOKUP_COLUMNS.iter().map(|c| c.to_string()).collect());
    };
    shard
        .filter_rows(|row| row[key].as_i64().is_some_and(|id| ids.contains(&id)))
        .select(&LOOKUP_COLUMNS)
}

#[async_trait(?Send)]
impl StatsProvider for SavantProvider {
    async fn fetch_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TabularDataset, AcquisitionError> {
        let mut rows = TabularDataset::default();
        for (from, to) in request_ranges(start, end, DAYS_PER_REQUEST) {
            let context = format!("window {} to {}", from, to);
            let part = self
                .get_csv(&self.search_url, &Self::search_query(from, to), &context)
                .await?;
            if part.len() >= SEARCH_ROW_CAP {
                tracing::warn!(
                    start = %from,
                    end = %to,
                    rows = part.len(),
                    "search response reached the row cap, rows may be missing"
                );
            }
            rows = rows.concat(&part);
        }
        Ok(rows)
    }

    async fn reverse_lookup(&self, ids: &[i64]) -> Result<TabularDataset, AcquisitionError> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let mut result =
            TabularDataset::empty(LOOKUP_COLUMNS.iter().map(|c| c.to_string()).collect());
        if wanted.is_empty() {
            return Ok(result);
        }

        for shard in REGISTER_SHARDS.chars() {
            let url = format!("{}/people-{}.csv", self.register_url, shard);
            let context = format!("register shard {}", shard);
            let people = self.get_csv(&url, &[], &context).await?;
            result = result.concat(&filter_register(&people, &wanted));
            tracing::debug!(shard = %shard, matched = result.len(), "register shard scanned");
        }

        tracing::info!(requested = wanted.len(), resolved = result.len(), "reverse lookup complete");
        Ok(result)
    }
}
