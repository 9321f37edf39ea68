//! Kopia Prometheus Exporter
//!
//! Turns the snapshot statistics of the [kopia](https://kopia.io) backup tool
//! into Prometheus metrics.
//!
//! # Overview
//!
//! Two delivery modes share one pipeline:
//!
//! - **server**: list the latest snapshot of every source on a timer and serve
//!   the result on `/metrics` for Prometheus to scrape
//! - **snapshot**: create one snapshot (optionally from a ZFS snapshot of the
//!   source) and push its metrics to a Prometheus push gateway
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   snapshot list/create   ┌──────────────────────────────┐
//! │   kopia     │ ◄──────────────────────  │           Exporter           │
//! │    CLI      │ ───────────────────────► │                              │
//! └─────────────┘        JSON              │ KopiaClient → stats::parse   │
//!                                          │   → metrics::to_samples      │
//!                                          │                              │      /metrics     ┌────────────┐
//!                                          │  server: RefreshLoop ────────┼─────────────────► │ Prometheus │
//!                                          │  snapshot: PushGateway ──────┼──┐                └────────────┘
//!                                          └──────────────────────────────┘  │ PUT  ┌──────────────┐
//!                                                                            └────► │ Push gateway │
//!                                                                                   └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`kopia`] - kopia CLI invocation and raw JSON types
//! - [`stats`] - normalized per-source backup statistics
//! - [`metrics`] - sample mapping and Prometheus registries
//! - [`collector`] - the shared raw-records-to-samples pipeline
//! - [`server`] - HTTP server and refresh loop
//! - [`snapshot`] - one-shot snapshot and push
//! - [`push`] - push gateway client
//! - [`zfs`] - ZFS snapshot lifecycle
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use kopia_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("kopia-exporter.yaml"))?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod kopia;
pub mod metrics;
pub mod push;
pub mod server;
pub mod snapshot;
pub mod stats;
pub mod zfs;
