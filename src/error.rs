use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Backup tool not found: '{program}' is not installed or not on PATH")]
    ToolNotFound { program: String },

    #[error("Backup tool failed: `{command}` exited with {code}: {stderr}")]
    ToolExecutionFailed {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("Backup tool timed out: `{command}` did not finish within {limit:?}")]
    Timeout {
        command: String,
        limit: std::time::Duration,
    },

    #[error("Malformed backup tool output: {0}")]
    MalformedOutput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Push gateway rejected metrics with HTTP {status}: {body}")]
    PushRejected { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
