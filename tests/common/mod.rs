//! Test helpers shared by the integration tests
#![allow(dead_code)]

use kopia_exporter::error::{ExporterError, Result};
use kopia_exporter::kopia::BackupTool;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Canned kopia output. Each `list_snapshots` call pops the next listing;
/// once they run out the last one is repeated.
#[derive(Default)]
pub struct FakeTool {
    listings: Mutex<VecDeque<std::result::Result<Vec<Value>, String>>>,
    created: Mutex<Option<std::result::Result<Value, String>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeTool {
    pub fn with_listings(listings: Vec<std::result::Result<Vec<Value>, String>>) -> Self {
        Self {
            listings: Mutex::new(listings.into()),
            ..Self::default()
        }
    }

    pub fn with_created(created: std::result::Result<Value, String>) -> Self {
        Self {
            created: Mutex::new(Some(created)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn tool_failure(command: &str, stderr: String) -> ExporterError {
    ExporterError::ToolExecutionFailed {
        command: command.to_string(),
        code: "1".to_string(),
        stderr,
    }
}

impl BackupTool for FakeTool {
    async fn list_snapshots(&self) -> Result<Vec<Value>> {
        self.calls.lock().unwrap().push("list".to_string());
        let next = {
            let mut listings = self.listings.lock().unwrap();
            if listings.len() > 1 {
                listings.pop_front()
            } else {
                listings.front().cloned()
            }
        };
        match next {
            Some(Ok(records)) => Ok(records),
            Some(Err(stderr)) => Err(tool_failure("kopia snapshot list", stderr)),
            None => Ok(Vec::new()),
        }
    }

    async fn create_snapshot(&self, source: &str, override_source: Option<&str>) -> Result<Value> {
        self.calls.lock().unwrap().push(format!(
            "create {} {}",
            source,
            override_source.unwrap_or("-")
        ));
        let created = self.created.lock().unwrap().take();
        match created {
            Some(Ok(record)) => Ok(record),
            Some(Err(stderr)) => Err(tool_failure("kopia snapshot create", stderr)),
            None => Err(ExporterError::MalformedOutput("no canned snapshot".into())),
        }
    }
}

/// A tool whose calls never complete, like kopia stuck on a locked repository
pub struct HangingTool {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl HangingTool {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl BackupTool for HangingTool {
    async fn list_snapshots(&self) -> Result<Vec<Value>> {
        self.calls.lock().unwrap().push("list".to_string());
        std::future::pending().await
    }

    async fn create_snapshot(&self, _source: &str, _override_source: Option<&str>) -> Result<Value> {
        self.calls.lock().unwrap().push("create".to_string());
        std::future::pending().await
    }
}

/// A listed snapshot record with integer timestamps
pub fn record(host: &str, path: &str, user: &str, total_size: u64, start: i64, end: i64) -> Value {
    json!({
        "id": format!("{host}-{user}-{total_size}"),
        "source": {"host": host, "userName": user, "path": path},
        "startTime": start,
        "endTime": end,
        "stats": {
            "totalSize": total_size,
            "fileCount": 10,
            "dirCount": 2,
            "errorCount": 0
        }
    })
}

/// A record as printed by `kopia snapshot create --json`
pub fn created_record() -> Value {
    json!({
        "id": "d17c3a6646315ceef999c03263a02c2c",
        "source": {"host": "freenas", "userName": "root", "path": "/path/to/snapshot"},
        "description": "",
        "startTime": "2024-09-01T08:55:44.903686Z",
        "endTime": "2024-09-01T08:55:46.904094Z",
        "rootEntry": {
            "name": "utils",
            "type": "d",
            "mode": "0755",
            "mtime": "2024-08-19T14:35:05.780079377Z",
            "uid": 501,
            "gid": 20,
            "obj": "kc673fec234393693793143dcc8eefb7f",
            "summ": {
                "size": 277,
                "files": 1,
                "symlinks": 0,
                "dirs": 1,
                "maxTime": "2024-08-19T14:35:05.780023377Z",
                "numFailed": 0
            }
        }
    })
}
