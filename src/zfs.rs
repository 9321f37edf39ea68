//! ZFS snapshot lifecycle
//!
//! Snapshot mode can freeze the source dataset with `zfs snapshot` before kopia
//! reads it and drop the snapshot with `zfs destroy` afterwards.

use crate::error::Result;
use crate::kopia::ToolCommand;
use std::time::Duration;
use tracing::info;

const ZFS_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct ZfsSnapshot {
    binary: String,
    name: String,
}

impl ZfsSnapshot {
    /// `name` is the full `pool/dataset@snapshot` name
    pub fn new(binary: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn create(&self) -> Result<()> {
        ToolCommand::new(&self.binary)
            .args(["snapshot", self.name.as_str()])
            .run(ZFS_TIMEOUT)
            .await?;
        info!("Created ZFS snapshot {}", self.name);
        Ok(())
    }

    pub async fn destroy(&self) -> Result<()> {
        ToolCommand::new(&self.binary)
            .args(["destroy", self.name.as_str()])
            .run(ZFS_TIMEOUT)
            .await?;
        info!("Destroyed ZFS snapshot {}", self.name);
        Ok(())
    }
}
