//! Sample collection
//!
//! The pipeline shared by both delivery modes: raw kopia records in, metric
//! samples out. Nothing here runs a process or touches a registry.
//!
//! # Error Handling
//!
//! The two modes differ only in how they treat a bad record:
//! - [`collect_samples`] (server mode) logs a warning, skips the record and
//!   keeps going, so one broken source never blanks out the others
//! - [`snapshot_samples`] (snapshot mode) returns the error to abort the run

use crate::error::Result;
use crate::metrics::{to_samples, MetricSample};
use crate::stats::{self, BackupStats};
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of turning one listing into samples
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub samples: Vec<MetricSample>,
    /// Distinct sources that made it into `samples`
    pub sources: usize,
    /// Records dropped because they could not be parsed
    pub skipped: usize,
}

/// Parse every record, keep the newest per source and map it to samples.
pub fn collect_samples(records: &[Value]) -> Collection {
    let mut parsed: Vec<BackupStats> = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (index, raw) in records.iter().enumerate() {
        match stats::parse(raw) {
            Ok(stats) => parsed.push(stats),
            Err(e) => {
                warn!("Skipping snapshot record #{}: {}", index, e);
                skipped += 1;
            }
        }
    }

    let latest = stats::latest_per_source(parsed);
    for stats in &latest {
        debug!(
            "Collected {}@{}:{} ({} bytes)",
            stats.user, stats.host, stats.path, stats.total_size
        );
    }

    Collection {
        samples: latest.iter().flat_map(to_samples).collect(),
        sources: latest.len(),
        skipped,
    }
}

/// Samples for a freshly created snapshot. Any parse failure is returned.
pub fn snapshot_samples(
    raw: &Value,
    override_source: Option<&str>,
) -> Result<(BackupStats, Vec<MetricSample>)> {
    let stats = stats::parse_with_override(raw, override_source)?;
    let samples = to_samples(&stats);
    Ok((stats, samples))
}
