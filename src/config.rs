//! Configuration management
//!
//! Values are layered, lowest precedence first: built-in defaults, the optional
//! YAML file passed with `--conf`, then `KOPIA_EXPORTER__*` environment
//! variables. CLI flags are applied on top by the binary before [`Config::validate`].
//!
//! ```yaml
//! pushgateway: http://pushgateway.local:9091
//! job: kopia
//! kopia:
//!   config_file: /etc/kopia/repository.config
//! server:
//!   refresh_interval_seconds: 600
//! ```

use crate::error::{ExporterError, Result};
use anyhow::Context;
use reqwest::Url;
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_pushgateway")]
    pub pushgateway: String,
    #[serde(default = "default_job")]
    pub job: String,
    #[serde(default)]
    pub pushgateway_username: Option<String>,
    #[serde(default)]
    pub pushgateway_password: Option<SecretString>,
    /// Push under a {host, path, user} grouping key instead of the bare job.
    ///
    /// Off by default, so each push replaces everything under the job and a
    /// renamed or removed source leaves no stale series behind. Several sources
    /// sharing one job then overwrite each other; set this (or use one job per
    /// source) to keep them side by side, as older per-source setups expect.
    #[serde(default)]
    pub group_by_source: bool,
    #[serde(default)]
    pub kopia: KopiaConfig,
    #[serde(default)]
    pub zfs: ZfsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KopiaConfig {
    #[serde(default = "default_kopia_binary")]
    pub binary: String,
    /// Passed to kopia as `--config-file`
    #[serde(default)]
    pub config_file: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZfsConfig {
    #[serde(default = "default_zfs_binary")]
    pub binary: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

fn default_pushgateway() -> String {
    "http://localhost:9091".to_string()
}

fn default_job() -> String {
    "kopia".to_string()
}

fn default_kopia_binary() -> String {
    "kopia".to_string()
}

fn default_zfs_binary() -> String {
    "zfs".to_string()
}

fn default_timeout() -> u64 {
    3600
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_refresh_interval() -> u64 {
    600
}

impl Default for KopiaConfig {
    fn default() -> Self {
        Self {
            binary: default_kopia_binary(),
            config_file: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            binary: default_zfs_binary(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pushgateway: default_pushgateway(),
            job: default_job(),
            pushgateway_username: None,
            pushgateway_password: None,
            group_by_source: false,
            kopia: KopiaConfig::default(),
            zfs: ZfsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// A file that is named explicitly must exist.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder
                .add_source(config::File::new(path, config::FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("KOPIA_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject values that would make either mode misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.job.trim().is_empty() {
            return Err(ExporterError::Config("job name must not be empty".into()));
        }
        if self.server.refresh_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "refresh interval must be at least 1 second".into(),
            ));
        }
        if self.kopia.timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "kopia timeout must be at least 1 second".into(),
            ));
        }
        if self.kopia.binary.trim().is_empty() {
            return Err(ExporterError::Config("kopia binary must not be empty".into()));
        }
        self.pushgateway_url()?;
        Ok(())
    }

    /// The push gateway base URL. A bare `host:port` is treated as plain HTTP.
    pub fn pushgateway_url(&self) -> Result<Url> {
        let raw = self.pushgateway.trim();
        if raw.is_empty() {
            return Err(ExporterError::Config("pushgateway URL must not be empty".into()));
        }
        let candidate = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        let url = Url::parse(&candidate).map_err(|e| {
            ExporterError::Config(format!("invalid pushgateway URL '{raw}': {e}"))
        })?;
        if url.cannot_be_a_base() {
            return Err(ExporterError::Config(format!(
                "invalid pushgateway URL '{raw}': not a base URL"
            )));
        }
        Ok(url)
    }
}
