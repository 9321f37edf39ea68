//! External command execution
//!
//! Every call to kopia or zfs goes through [`ToolCommand::run`], which maps the
//! ways a child process can go wrong onto [`ExporterError`]:
//!
//! - executable missing → [`ExporterError::ToolNotFound`]
//! - non-zero exit → [`ExporterError::ToolExecutionFailed`] with captured stderr
//! - still running after the timeout → [`ExporterError::Timeout`], child killed

use crate::error::{ExporterError, Result};
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// A program plus its arguments, rendered for logs and error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Run to completion and return stdout.
    ///
    /// Dropping the returned future kills the child, so an abandoned collection
    /// never leaves a kopia process behind.
    pub async fn run(&self, timeout: Duration) -> Result<Vec<u8>> {
        info!("Running command: {}", self);

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExporterError::ToolNotFound {
                    program: self.program.clone(),
                },
                _ => ExporterError::Io(e),
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ExporterError::Timeout {
                    command: self.to_string(),
                    limit: timeout,
                })
            }
        };

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ExporterError::ToolExecutionFailed {
                command: self.to_string(),
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("`{}` wrote {} bytes", self, output.stdout.len());
        Ok(output.stdout)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
