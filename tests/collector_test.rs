//! Collector tests
//!
//! Tests for the raw-records-to-samples pipeline shared by both modes.

mod common;

use common::{created_record, record};
use kopia_exporter::collector::{collect_samples, snapshot_samples};
use kopia_exporter::metrics::MetricName;
use serde_json::json;

#[test]
fn test_collect_keeps_latest_record_per_source() {
    // Given: Two snapshots of the same source and one of another
    let records = vec![
        record("nas1", "/data", "root", 1024, 1000, 1010),
        record("nas1", "/data", "root", 4096, 2000, 2010),
        record("nas2", "/home", "alice", 2048, 1500, 1530),
    ];

    // When: Collecting
    let collection = collect_samples(&records);

    // Then: One source per key, the newer one for nas1
    assert_eq!(collection.sources, 2);
    assert_eq!(collection.skipped, 0);
    assert_eq!(collection.samples.len(), 14);
    let nas1_size = collection
        .samples
        .iter()
        .find(|s| s.name == MetricName::TotalSize && s.labels.host == "nas1")
        .unwrap();
    assert_eq!(nas1_size.value, 4096.0);
}

#[test]
fn test_collect_skips_malformed_records() {
    // Given: A listing with one record missing its source
    let records = vec![
        record("nas1", "/data", "root", 1024, 1000, 1010),
        json!({"id": "orphan"}),
        json!(42),
    ];

    // When: Collecting
    let collection = collect_samples(&records);

    // Then: The good source survives and both bad ones are counted
    assert_eq!(collection.sources, 1);
    assert_eq!(collection.skipped, 2);
    assert_eq!(collection.samples.len(), 7);
}

#[test]
fn test_collect_empty_listing() {
    let collection = collect_samples(&[]);
    assert!(collection.samples.is_empty());
    assert_eq!(collection.sources, 0);
}

#[test]
fn test_collected_samples_are_grouped_by_source() {
    let records = vec![
        record("nas2", "/home", "alice", 2048, 1500, 1530),
        record("nas1", "/data", "root", 1024, 1000, 1010),
    ];

    let collection = collect_samples(&records);

    // Sources come out in key order, seven samples at a time
    let hosts: Vec<&str> = collection
        .samples
        .chunks(7)
        .map(|chunk| chunk[0].labels.host.as_str())
        .collect();
    assert_eq!(hosts, vec!["nas1", "nas2"]);
}

#[test]
fn test_snapshot_samples_apply_override() {
    // Given: A created manifest and a logical source path
    let raw = created_record();

    // When: Mapping with an override
    let (stats, samples) = snapshot_samples(&raw, Some("/override/path")).unwrap();

    // Then: The path label is replaced and the counters come from the summary
    assert_eq!(stats.path, "/override/path");
    assert_eq!(stats.total_size, 277);
    assert!((stats.duration_seconds - 2.000408).abs() < 1e-9);
    assert!(samples.iter().all(|s| s.labels.path == "/override/path"));
    assert_eq!(samples.len(), 7);
}

#[test]
fn test_snapshot_samples_without_override_keep_kopia_path() {
    let (stats, _) = snapshot_samples(&created_record(), None).unwrap();
    assert_eq!(stats.path, "/path/to/snapshot");
}

#[test]
fn test_snapshot_samples_fail_on_malformed_manifest() {
    let result = snapshot_samples(&json!({"source": {"host": "nas1"}}), None);
    assert!(result.is_err());
}
