//! Kopia JSON Type Definitions
//!
//! Raw shapes of the records printed by `kopia snapshot list --json` and
//! `kopia snapshot create --json`.
//!
//! # Design Notes
//!
//! - **Loose by intent**: every field is optional. Deciding which fields are
//!   required happens in [`crate::stats`], so a record with a missing counter
//!   still deserializes and a record with a missing identity fails there with a
//!   precise message.
//! - **Two counter layouts**: `snapshot list` reports a `stats` block, while
//!   `snapshot create` only reports the directory summary under `rootEntry.summ`.
//! - **Timestamps**: kopia prints RFC 3339 strings with nanosecond precision.
//!   Integer Unix seconds are accepted as well.
//!
//! Sample record:
//!
//! ```json
//! {
//!   "id": "618f83d08a9938351e8d385a24aca252",
//!   "source": {"host": "freenas", "userName": "root", "path": "/mnt/tank/pictures"},
//!   "startTime": "2023-10-05T09:01:36.265095891Z",
//!   "endTime": "2023-10-05T09:01:55.028680144Z",
//!   "stats": {"totalSize": 162291781350, "fileCount": 8054, "dirCount": 221, "errorCount": 0},
//!   "rootEntry": {"name": "pictures", "type": "d", "summ": {"size": 162291781350, "files": 50560, "dirs": 221, "numFailed": 0}}
//! }
//! ```

#![allow(dead_code)] // Keep the full record shape even where only part is exported
use serde::Deserialize;

/// One snapshot manifest
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotJson {
    pub id: Option<String>,
    pub source: Option<SourceJson>,
    pub description: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub stats: Option<StatsJson>,
    pub root_entry: Option<RootEntryJson>,
    pub retention_reason: Option<Vec<String>>,
}

/// Snapshot source identity (`user@host:path`)
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceJson {
    pub host: Option<String>,
    pub user_name: Option<String>,
    pub path: Option<String>,
}

/// Upload statistics, present on listed snapshots
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    pub total_size: Option<u64>,
    pub excluded_total_size: Option<u64>,
    pub file_count: Option<u64>,
    pub cached_files: Option<u64>,
    pub non_cached_files: Option<u64>,
    pub dir_count: Option<u64>,
    pub excluded_file_count: Option<u64>,
    pub excluded_dir_count: Option<u64>,
    pub ignored_error_count: Option<u64>,
    pub error_count: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RootEntryJson {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub mode: Option<String>,
    pub mtime: Option<String>,
    pub obj: Option<String>,
    pub summ: Option<DirSummaryJson>,
}

/// Recursive directory summary of the snapshot root
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DirSummaryJson {
    pub size: Option<u64>,
    pub files: Option<u64>,
    pub symlinks: Option<u64>,
    pub dirs: Option<u64>,
    pub max_time: Option<String>,
    pub num_failed: Option<u64>,
}

/// A point in time as printed by kopia
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(i64),
    Rfc3339(String),
}
