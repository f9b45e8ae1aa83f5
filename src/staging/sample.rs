//! Uniform row sampling over the staging artifact
//!
//! Sampling draws `total - target` distinct data-row positions to skip,
//! uniformly without replacement, so every subset of `target` rows is equally
//! likely. Positions are 1-based relative to the first data row; the header
//! is never a candidate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::Rng;

use super::StagingError;
use crate::inference::SchemaDescriptor;
use crate::models::{TabularDataset, Value};

/// Default number of rows read for schema inference
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;

fn open_reader(path: &Path) -> Result<csv::Reader<BufReader<File>>, StagingError> {
    let file = File::open(path).map_err(|e| StagingError::io(path, e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file)))
}

/// Number of data rows in a staging file (header excluded)
pub fn count_data_rows(path: &Path) -> Result<usize, StagingError> {
    let mut rdr = open_reader(path)?;
    let mut record = csv::ByteRecord::new();
    let mut count = 0;
    while rdr
        .read_byte_record(&mut record)
        .map_err(|e| StagingError::csv(path, e))?
    {
        count += 1;
    }
    Ok(count)
}

/// Sorted, distinct 1-based data-row positions to skip
///
/// Empty when `total <= target`, meaning every row is kept.
pub fn skip_indices<R: Rng + ?Sized>(total: usize, target: usize, rng: &mut R) -> Vec<usize> {
    if total <= target {
        return Vec::new();
    }

    let mut skip: Vec<usize> = rand::seq::index::sample(rng, total, total - target)
        .into_iter()
        .map(|i| i + 1)
        .collect();
    skip.sort_unstable();
    skip
}

/// Read a uniform sample of `min(total, target)` data rows
pub fn read_sample<R: Rng + ?Sized>(
    path: &Path,
    target: usize,
    rng: &mut R,
) -> Result<TabularDataset, StagingError> {
    let total = count_data_rows(path)?;
    let skip = skip_indices(total, target, rng);

    let mut rdr = open_reader(path)?;
    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| StagingError::csv(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if columns.is_empty() {
        return Err(StagingError::Empty(path.to_path_buf()));
    }

    let mut next_skip = skip.iter().peekable();
    let mut rows = Vec::with_capacity(total - skip.len());
    for (position, record) in (1..).zip(rdr.records()) {
        let record = record.map_err(|e| StagingError::csv(path, e))?;
        if next_skip.peek() == Some(&&position) {
            next_skip.next();
            continue;
        }
        rows.push(record.iter().map(Value::raw).collect());
    }

    tracing::debug!(total, sampled = rows.len(), "staging sample read");
    Ok(TabularDataset::new(columns, rows))
}

/// Sample the staging file and infer a schema descriptor from the sample
pub fn infer_from_staging<R: Rng + ?Sized>(
    path: &Path,
    target: usize,
    rng: &mut R,
) -> Result<SchemaDescriptor, StagingError> {
    let sample = read_sample(path, target, rng)?;
    let descriptor = SchemaDescriptor::infer(&sample);
    tracing::info!(
        path = %path.display(),
        columns = descriptor.len(),
        sampled_rows = descriptor.sampled_rows,
        "schema inferred"
    );
    Ok(descriptor)
}
