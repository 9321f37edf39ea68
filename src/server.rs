//! HTTP Server and Refresh Loop
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing `/metrics`, `/health`, and `/`
//! - **Refresh Loop**: Background task that lists kopia snapshots, builds a
//!   complete new registry and publishes it, then sleeps for the refresh interval
//! - **Published Registry**: [`SharedRegistry`] holds the latest
//!   [`RegistrySnapshot`] behind an atomic pointer swap. Scrapes load the current
//!   snapshot and never wait for a collection in progress
//!
//! # Error Handling
//!
//! Unparseable records are skipped with a warning and counted in
//! `kopia_exporter_skipped_sources`. If the listing itself fails, the previous
//! samples are republished with `kopia_exporter_up` set to 0.
//!
//! # Shutdown
//!
//! SIGINT/SIGTERM stop the HTTP server and drop the in-flight collection, which
//! kills the kopia child process. A dropped collection publishes nothing.

use crate::collector;
use crate::config::Config;
use crate::error::Result;
use crate::kopia::{BackupTool, KopiaClient};
use crate::metrics::{ExporterStatus, MetricSample, MetricsCollector};
use anyhow::Context;
use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// One fully built, immutable registry
pub struct RegistrySnapshot {
    metrics: MetricsCollector,
    status: ExporterStatus,
}

impl RegistrySnapshot {
    /// `collected_at` is the Unix time at which `samples` were listed, which
    /// differs from now when a failed cycle republishes older samples.
    pub fn build(
        samples: &[MetricSample],
        up: bool,
        skipped: usize,
        collected_at: f64,
    ) -> Result<Self> {
        let metrics = MetricsCollector::from_samples(samples)?;
        let status = ExporterStatus::register(metrics.registry())?;
        status.up.set(if up { 1.0 } else { 0.0 });
        status.skipped_sources.set(skipped as i64);
        status.last_refresh_timestamp_seconds.set(collected_at);
        Ok(Self { metrics, status })
    }

    /// Registry served before the first collection finishes
    pub fn empty() -> Result<Self> {
        let metrics = MetricsCollector::new()?;
        let status = ExporterStatus::register(metrics.registry())?;
        Ok(Self { metrics, status })
    }

    pub fn is_up(&self) -> bool {
        self.status.up.get() > 0.0
    }

    pub fn render(&self) -> Result<String> {
        self.metrics.render()
    }
}

/// The registry the pull endpoint serves, replaced wholesale on every refresh
#[derive(Clone)]
pub struct SharedRegistry {
    current: Arc<ArcSwap<RegistrySnapshot>>,
}

impl SharedRegistry {
    pub fn new() -> Result<Self> {
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(RegistrySnapshot::empty()?)),
        })
    }

    pub fn publish(&self, snapshot: RegistrySnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    pub fn load(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }
}

/// Result of one collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub up: bool,
    pub sources: usize,
    pub skipped: usize,
}

/// Collects from a [`BackupTool`] and publishes into a [`SharedRegistry`]
pub struct RefreshLoop<T> {
    tool: T,
    registry: SharedRegistry,
    last_samples: Vec<MetricSample>,
    last_sources: usize,
    last_collected_at: f64,
}

impl<T: BackupTool> RefreshLoop<T> {
    pub fn new(tool: T, registry: SharedRegistry) -> Self {
        Self {
            tool,
            registry,
            last_samples: Vec::new(),
            last_sources: 0,
            last_collected_at: 0.0,
        }
    }

    /// Run one Collecting → Published cycle.
    pub async fn refresh(&mut self) -> Result<CycleReport> {
        info!("Collecting kopia snapshot statistics");

        let (snapshot, report) = match self.tool.list_snapshots().await {
            Ok(records) => {
                let collection = collector::collect_samples(&records);
                let collected_at = unix_now();
                let snapshot = RegistrySnapshot::build(
                    &collection.samples,
                    true,
                    collection.skipped,
                    collected_at,
                )?;
                self.last_samples = collection.samples;
                self.last_sources = collection.sources;
                self.last_collected_at = collected_at;
                let report = CycleReport {
                    up: true,
                    sources: collection.sources,
                    skipped: collection.skipped,
                };
                (snapshot, report)
            }
            Err(e) => {
                warn!("Failed to list kopia snapshots: {}", e);
                let snapshot = RegistrySnapshot::build(
                    &self.last_samples,
                    false,
                    0,
                    self.last_collected_at,
                )?;
                let report = CycleReport {
                    up: false,
                    sources: self.last_sources,
                    skipped: 0,
                };
                (snapshot, report)
            }
        };

        self.registry.publish(snapshot);
        info!(
            "Published metrics for {} sources ({} skipped)",
            report.sources, report.skipped
        );
        Ok(report)
    }

    /// Refresh, then sleep, forever.
    pub async fn run(mut self, interval: Duration) {
        loop {
            if let Err(e) = self.refresh().await {
                error!("Failed to publish metrics: {}", e);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let client = KopiaClient::new(&config.kopia);
    let version = client
        .version()
        .await
        .context("kopia is not usable")?;
    info!("Using kopia {}", version);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    serve(
        listener,
        client,
        SharedRegistry::new()?,
        Duration::from_secs(config.server.refresh_interval_seconds),
        shutdown_signal(),
    )
    .await
}

/// Serve the pull endpoint and drive the refresh loop until `shutdown` resolves.
pub async fn serve<T, F>(
    listener: TcpListener,
    tool: T,
    registry: SharedRegistry,
    interval: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    T: BackupTool + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    // Start background metrics collection
    let refresh = RefreshLoop::new(tool, registry.clone());
    let collection = tokio::spawn(async move {
        tokio::select! {
            _ = refresh.run(interval) => {}
            _ = stop_rx.changed() => info!("Collection loop stopped"),
        }
    });

    let served = axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        })
        .await;

    // Dropping the sender on error also stops the loop
    collection.await.context("Collection loop panicked")?;
    served.context("HTTP server error")?;
    Ok(())
}

pub fn router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Kopia Exporter</title></head>
<body>
<h1>Kopia Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(State(registry): State<SharedRegistry>) -> Response {
    match registry.load().render() {
        Ok(metrics) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], metrics).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(registry): State<SharedRegistry>) -> impl IntoResponse {
    if registry.load().is_up() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "kopia snapshot listing failing")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
