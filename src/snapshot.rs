//! One-shot snapshot and push
//!
//! Strictly linear, no retries:
//!
//! 1. `zfs snapshot` the source dataset (optional)
//! 2. `kopia snapshot create` the source
//! 3. `zfs destroy` the dataset snapshot (optional, also after a failed backup)
//! 4. parse the manifest and map it to samples
//! 5. push the samples as one batch
//!
//! Any failure aborts the run before anything is pushed.

use crate::collector;
use crate::config::Config;
use crate::error::Result;
use crate::kopia::{BackupTool, KopiaClient};
use crate::push::PushGateway;
use crate::stats::BackupStats;
use crate::zfs::ZfsSnapshot;
use anyhow::Context;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    /// Path handed to kopia, e.g. a ZFS snapshot mount
    pub source: String,
    /// Logical source recorded by kopia and exported as the `path` label
    pub override_source: Option<String>,
    /// `pool/dataset@name` to create before and destroy after the backup
    pub zfs_snapshot: Option<String>,
}

pub async fn run(config: &Config, request: &SnapshotRequest) -> anyhow::Result<()> {
    let client = KopiaClient::new(&config.kopia);
    let gateway = PushGateway::from_config(config).context("Invalid push gateway settings")?;
    let zfs = request
        .zfs_snapshot
        .as_deref()
        .map(|name| ZfsSnapshot::new(config.zfs.binary.clone(), name));

    let stats = snapshot_and_push(&client, zfs.as_ref(), &gateway, request)
        .await
        .with_context(|| format!("Snapshot of {} failed", request.source))?;

    info!(
        "Backed up {}@{}:{} ({} bytes, {} files, {} errors) in {:.1}s",
        stats.user,
        stats.host,
        stats.path,
        stats.total_size,
        stats.file_count,
        stats.error_count,
        stats.duration_seconds
    );
    Ok(())
}

pub async fn snapshot_and_push<T: BackupTool>(
    tool: &T,
    zfs: Option<&ZfsSnapshot>,
    gateway: &PushGateway,
    request: &SnapshotRequest,
) -> Result<BackupStats> {
    if let Some(zfs) = zfs {
        zfs.create().await?;
    }

    let created = tool
        .create_snapshot(&request.source, request.override_source.as_deref())
        .await;

    let destroyed = match zfs {
        Some(zfs) => zfs.destroy().await,
        None => Ok(()),
    };

    let raw = match (created, destroyed) {
        (Ok(raw), Ok(())) => raw,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(destroy_err)) => {
            let name = zfs.map(ZfsSnapshot::name).unwrap_or_default();
            warn!(
                "Failed to destroy ZFS snapshot {} after failed backup: {}",
                name, destroy_err
            );
            return Err(e);
        }
    };

    let (stats, samples) = collector::snapshot_samples(&raw, request.override_source.as_deref())?;
    gateway.push(&samples).await?;
    Ok(stats)
}
