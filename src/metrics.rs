//! Prometheus Metrics Definitions
//!
//! Every backup source yields exactly seven samples, in this order, each
//! labeled with `host`, `path` and `user`:
//!
//! | Metric | Type | Unit |
//! | --- | --- | --- |
//! | `total_size` | gauge | bytes |
//! | `file_count` | counter | files |
//! | `dir_count` | counter | directories |
//! | `error_count` | counter | errors |
//! | `backup_duration` | gauge | seconds |
//! | `backup_start_time` | gauge | Unix seconds |
//! | `backup_end_time` | gauge | Unix seconds |
//!
//! [`to_samples`] is the pure mapping. [`MetricsCollector`] turns a batch of
//! samples into a Prometheus registry that can be rendered for a scrape or a
//! push. A collector is built once per batch and never patched afterwards.
//!
//! Server mode adds the [`ExporterStatus`] gauges under the `kopia_exporter_`
//! namespace.

use crate::error::{ExporterError, Result};
use crate::stats::{BackupStats, SourceKey};
use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::collections::BTreeMap;

pub const LABELS: [&str; 3] = ["host", "path", "user"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricName {
    TotalSize,
    FileCount,
    DirCount,
    ErrorCount,
    BackupDuration,
    BackupStartTime,
    BackupEndTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl MetricName {
    pub const ALL: [MetricName; 7] = [
        MetricName::TotalSize,
        MetricName::FileCount,
        MetricName::DirCount,
        MetricName::ErrorCount,
        MetricName::BackupDuration,
        MetricName::BackupStartTime,
        MetricName::BackupEndTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::TotalSize => "total_size",
            MetricName::FileCount => "file_count",
            MetricName::DirCount => "dir_count",
            MetricName::ErrorCount => "error_count",
            MetricName::BackupDuration => "backup_duration",
            MetricName::BackupStartTime => "backup_start_time",
            MetricName::BackupEndTime => "backup_end_time",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricName::TotalSize => "Total size of the backup in bytes",
            MetricName::FileCount => "Number of files in the backup",
            MetricName::DirCount => "Number of directories in the backup",
            MetricName::ErrorCount => "Number of errors in the backup",
            MetricName::BackupDuration => "Duration of the backup in seconds",
            MetricName::BackupStartTime => "Start time of the backup as a Unix timestamp",
            MetricName::BackupEndTime => "End time of the backup as a Unix timestamp",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricName::FileCount | MetricName::DirCount | MetricName::ErrorCount => {
                MetricKind::Counter
            }
            _ => MetricKind::Gauge,
        }
    }
}

/// One labeled value derived from a [`BackupStats`]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: MetricName,
    pub labels: SourceKey,
    pub value: f64,
}

impl MetricSample {
    /// Label values in [`LABELS`] order
    pub fn label_values(&self) -> [&str; 3] {
        [
            self.labels.host.as_str(),
            self.labels.path.as_str(),
            self.labels.user.as_str(),
        ]
    }
}

/// Map one source's statistics to its seven samples.
pub fn to_samples(stats: &BackupStats) -> Vec<MetricSample> {
    let key = stats.key();
    MetricName::ALL
        .into_iter()
        .map(|name| {
            let value = match name {
                MetricName::TotalSize => stats.total_size as f64,
                MetricName::FileCount => stats.file_count as f64,
                MetricName::DirCount => stats.dir_count as f64,
                MetricName::ErrorCount => stats.error_count as f64,
                MetricName::BackupDuration => stats.duration_seconds,
                MetricName::BackupStartTime => stats.start_time as f64,
                MetricName::BackupEndTime => stats.end_time as f64,
            };
            MetricSample {
                name,
                labels: key.clone(),
                value,
            }
        })
        .collect()
}

/// Prometheus registry holding one batch of backup samples
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Registry,

    pub total_size: GaugeVec,
    pub file_count: IntCounterVec,
    pub dir_count: IntCounterVec,
    pub error_count: IntCounterVec,
    pub backup_duration: GaugeVec,
    pub backup_start_time: GaugeVec,
    pub backup_end_time: GaugeVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let gauge = |name: MetricName| -> Result<GaugeVec> {
            let vec = GaugeVec::new(Opts::new(name.as_str(), name.help()), &LABELS)?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };
        let counter = |name: MetricName| -> Result<IntCounterVec> {
            let vec = IntCounterVec::new(Opts::new(name.as_str(), name.help()), &LABELS)?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };

        let total_size = gauge(MetricName::TotalSize)?;
        let file_count = counter(MetricName::FileCount)?;
        let dir_count = counter(MetricName::DirCount)?;
        let error_count = counter(MetricName::ErrorCount)?;
        let backup_duration = gauge(MetricName::BackupDuration)?;
        let backup_start_time = gauge(MetricName::BackupStartTime)?;
        let backup_end_time = gauge(MetricName::BackupEndTime)?;

        Ok(Self {
            registry,
            total_size,
            file_count,
            dir_count,
            error_count,
            backup_duration,
            backup_start_time,
            backup_end_time,
        })
    }

    /// Build a fresh registry from a batch. When a (name, labels) pair occurs
    /// more than once the last sample wins.
    pub fn from_samples(samples: &[MetricSample]) -> Result<Self> {
        let collector = Self::new()?;
        let latest: BTreeMap<(MetricName, &SourceKey), &MetricSample> = samples
            .iter()
            .map(|sample| ((sample.name, &sample.labels), sample))
            .collect();
        for sample in latest.into_values() {
            collector.record(sample);
        }
        Ok(collector)
    }

    fn record(&self, sample: &MetricSample) {
        let labels = sample.label_values();
        match sample.name {
            MetricName::TotalSize => self.total_size.with_label_values(&labels).set(sample.value),
            MetricName::FileCount => set_counter(&self.file_count, &labels, sample.value),
            MetricName::DirCount => set_counter(&self.dir_count, &labels, sample.value),
            MetricName::ErrorCount => set_counter(&self.error_count, &labels, sample.value),
            MetricName::BackupDuration => {
                self.backup_duration.with_label_values(&labels).set(sample.value)
            }
            MetricName::BackupStartTime => {
                self.backup_start_time.with_label_values(&labels).set(sample.value)
            }
            MetricName::BackupEndTime => {
                self.backup_end_time.with_label_values(&labels).set(sample.value)
            }
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            ExporterError::Metrics(prometheus::Error::Msg(format!(
                "exposition is not UTF-8: {e}"
            )))
        })
    }
}

// Counters only move up; each label set is written once per fresh registry.
fn set_counter(vec: &IntCounterVec, labels: &[&str; 3], value: f64) {
    let counter = vec.with_label_values(labels);
    counter.reset();
    counter.inc_by(value.max(0.0) as u64);
}

/// Health of the refresh loop itself, server mode only
#[derive(Clone)]
pub struct ExporterStatus {
    pub up: Gauge,
    pub skipped_sources: IntGauge,
    pub last_refresh_timestamp_seconds: Gauge,
}

impl ExporterStatus {
    pub fn register(registry: &Registry) -> Result<Self> {
        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last kopia snapshot listing succeeded (1=yes, 0=no)")
                .namespace("kopia_exporter"),
        )?;
        let skipped_sources = IntGauge::with_opts(
            Opts::new(
                "skipped_sources",
                "Snapshot records skipped in the last refresh because they could not be parsed",
            )
            .namespace("kopia_exporter"),
        )?;
        let last_refresh_timestamp_seconds = Gauge::with_opts(
            Opts::new(
                "last_refresh_timestamp_seconds",
                "Unix time at which the published metrics were collected",
            )
            .namespace("kopia_exporter"),
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(skipped_sources.clone()))?;
        registry.register(Box::new(last_refresh_timestamp_seconds.clone()))?;

        Ok(Self {
            up,
            skipped_sources,
            last_refresh_timestamp_seconds,
        })
    }
}
