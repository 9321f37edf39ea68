//! Kopia CLI Client
//!
//! Runs kopia subcommands and returns their JSON output as raw records. The
//! records are deliberately left as [`serde_json::Value`]: one malformed entry
//! in a listing must not fail the whole listing, so per-record decoding happens
//! in [`crate::stats`].
//!
//! # Example
//!
//! ```no_run
//! use kopia_exporter::config::KopiaConfig;
//! use kopia_exporter::kopia::{BackupTool, KopiaClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = KopiaClient::new(&KopiaConfig::default());
//! let records = client.list_snapshots().await?;
//! println!("{} sources", records.len());
//! # Ok(())
//! # }
//! ```

use crate::config::KopiaConfig;
use crate::error::{ExporterError, Result};
use crate::kopia::command::ToolCommand;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// The operations the exporter needs from a backup tool.
///
/// [`KopiaClient`] is the production implementation; the delivery drivers are
/// generic over this trait so they can run against canned output.
pub trait BackupTool: Send + Sync {
    /// Latest snapshot of every known source, one raw record each
    fn list_snapshots(&self) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Create a new snapshot of `source` and return its manifest
    fn create_snapshot(
        &self,
        source: &str,
        override_source: Option<&str>,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Client for the `kopia` command line
#[derive(Debug, Clone)]
pub struct KopiaClient {
    binary: String,
    config_file: Option<String>,
    timeout: Duration,
}

impl KopiaClient {
    pub fn new(config: &KopiaConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            config_file: config.config_file.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Probe the binary. Used at startup so a missing kopia is fatal early.
    pub async fn version(&self) -> Result<String> {
        let out = ToolCommand::new(&self.binary)
            .arg("--version")
            .run(self.timeout)
            .await?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    pub(crate) fn list_command(&self) -> ToolCommand {
        self.with_config_file(
            ToolCommand::new(&self.binary).args(["snapshot", "list", "-n", "1", "--json"]),
        )
    }

    pub(crate) fn create_command(&self, source: &str, override_source: Option<&str>) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.binary).args(["snapshot", "create", "--json"]);
        if let Some(path) = override_source {
            cmd = cmd.args(["--override-source", path]);
        }
        self.with_config_file(cmd).arg(source)
    }

    fn with_config_file(&self, cmd: ToolCommand) -> ToolCommand {
        match &self.config_file {
            Some(path) => cmd.args(["--config-file", path.as_str()]),
            None => cmd,
        }
    }
}

impl BackupTool for KopiaClient {
    async fn list_snapshots(&self) -> Result<Vec<Value>> {
        let cmd = self.list_command();
        let stdout = cmd.run(self.timeout).await?;
        decode_listing(&cmd, &stdout)
    }

    async fn create_snapshot(&self, source: &str, override_source: Option<&str>) -> Result<Value> {
        let cmd = self.create_command(source, override_source);
        let stdout = cmd.run(self.timeout).await?;
        decode_manifest(&cmd, &stdout)
    }
}

fn decode_listing(cmd: &ToolCommand, stdout: &[u8]) -> Result<Vec<Value>> {
    // An empty repository prints nothing at all
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(stdout).map_err(|e| {
        ExporterError::MalformedOutput(format!("`{cmd}` did not print a JSON array: {e}"))
    })
}

fn decode_manifest(cmd: &ToolCommand, stdout: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(stdout).map_err(|e| {
        ExporterError::MalformedOutput(format!("`{cmd}` did not print JSON: {e}"))
    })?;
    // Some kopia versions wrap a single manifest in an array
    match value {
        Value::Object(_) => Ok(value),
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => Ok(items.remove(0)),
        other => Err(ExporterError::MalformedOutput(format!(
            "`{cmd}` printed {} instead of a snapshot manifest",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
