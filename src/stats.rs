//! Backup statistics
//!
//! [`BackupStats`] is the strict, fully-typed form of one kopia snapshot. All
//! tolerance for kopia's loosely-typed output lives in [`parse_snapshot`]:
//!
//! - source `host`, `userName` and `path` are required; a record without them
//!   cannot be labeled and is rejected as [`ExporterError::MalformedOutput`]
//! - counters come from `stats` when present, otherwise from `rootEntry.summ`;
//!   any missing counter is zero
//! - a missing timestamp is zero, and the duration is only computed when both
//!   timestamps are present
//! - an end time before the start time (clock skew) is pulled up to the start
//!   time, so the duration is never negative

use crate::error::{ExporterError, Result};
use crate::kopia::types::{SnapshotJson, Timestamp};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Identity of one logical backup source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
    pub host: String,
    pub path: String,
    pub user: String,
}

/// Normalized statistics of the latest snapshot of one source
#[derive(Debug, Clone, PartialEq)]
pub struct BackupStats {
    pub host: String,
    pub path: String,
    pub user: String,
    pub total_size: u64,
    pub file_count: u64,
    pub dir_count: u64,
    pub error_count: u64,
    pub duration_seconds: f64,
    pub start_time: i64,
    pub end_time: i64,
}

impl BackupStats {
    pub fn key(&self) -> SourceKey {
        SourceKey {
            host: self.host.clone(),
            path: self.path.clone(),
            user: self.user.clone(),
        }
    }

    /// Replace the exported path, e.g. with the logical source of a snapshot
    /// taken from a ZFS snapshot mount.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Parse one raw record as printed by kopia.
pub fn parse(raw: &serde_json::Value) -> Result<BackupStats> {
    let snapshot = SnapshotJson::deserialize(raw).map_err(|e| {
        ExporterError::MalformedOutput(format!("snapshot record has an unexpected shape: {e}"))
    })?;
    parse_snapshot(snapshot)
}

/// Parse a raw record, substituting `override_source` for the path label.
pub fn parse_with_override(
    raw: &serde_json::Value,
    override_source: Option<&str>,
) -> Result<BackupStats> {
    let stats = parse(raw)?;
    Ok(match override_source {
        Some(path) => stats.with_path(path),
        None => stats,
    })
}

pub fn parse_snapshot(snapshot: SnapshotJson) -> Result<BackupStats> {
    let id = snapshot.id.as_deref().unwrap_or("<unknown>");
    let source = snapshot.source.as_ref().ok_or_else(|| {
        ExporterError::MalformedOutput(format!("snapshot {id} has no source"))
    })?;
    let required = |value: &Option<String>, field: &str| {
        value.clone().ok_or_else(|| {
            ExporterError::MalformedOutput(format!("snapshot {id} has no source {field}"))
        })
    };
    let host = required(&source.host, "host")?;
    let path = required(&source.path, "path")?;
    let user = required(&source.user_name, "userName")?;

    let (total_size, file_count, dir_count, error_count) =
        match (&snapshot.stats, snapshot.root_entry.as_ref().and_then(|e| e.summ.as_ref())) {
            (Some(stats), _) => (
                stats.total_size.unwrap_or(0),
                stats.file_count.unwrap_or(0),
                stats.dir_count.unwrap_or(0),
                stats.error_count.unwrap_or(0),
            ),
            (None, Some(summ)) => (
                summ.size.unwrap_or(0),
                summ.files.unwrap_or(0),
                summ.dirs.unwrap_or(0),
                summ.num_failed.unwrap_or(0),
            ),
            (None, None) => (0, 0, 0, 0),
        };

    let start = snapshot.start_time.as_ref().map(to_datetime).transpose()?;
    let end = snapshot.end_time.as_ref().map(to_datetime).transpose()?;

    let (start_time, end_time, duration_seconds) = match (start, end) {
        (Some(start), Some(end)) if end >= start => {
            (start.timestamp(), end.timestamp(), seconds_between(start, end))
        }
        // Clock skew
        (Some(start), Some(_)) => (start.timestamp(), start.timestamp(), 0.0),
        (start, end) => (
            start.map_or(0, |t| t.timestamp()),
            end.map_or(0, |t| t.timestamp()),
            0.0,
        ),
    };

    Ok(BackupStats {
        host,
        path,
        user,
        total_size,
        file_count,
        dir_count,
        error_count,
        duration_seconds,
        start_time,
        end_time,
    })
}

/// Keep one record per source: the one that finished last. Later records win
/// ties. The result is ordered by source key.
pub fn latest_per_source(records: impl IntoIterator<Item = BackupStats>) -> Vec<BackupStats> {
    let mut latest: BTreeMap<SourceKey, BackupStats> = BTreeMap::new();
    for stats in records {
        let key = stats.key();
        match latest.get(&key) {
            Some(existing) if existing.end_time > stats.end_time => {}
            _ => {
                latest.insert(key, stats);
            }
        }
    }
    latest.into_values().collect()
}

fn to_datetime(ts: &Timestamp) -> Result<DateTime<Utc>> {
    match ts {
        Timestamp::Unix(secs) => DateTime::from_timestamp(*secs, 0).ok_or_else(|| {
            ExporterError::MalformedOutput(format!("timestamp {secs} is out of range"))
        }),
        Timestamp::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ExporterError::MalformedOutput(format!("invalid timestamp '{text}': {e}"))),
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
    .max(0.0)
}
