use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};
use super::{MediaCommand, ToolOutput, ToolRunner};

/// Tool runner backed by real child processes
pub struct SystemToolRunner {
    timeout: Option<Duration>,
}

impl SystemToolRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, command: &MediaCommand) -> Result<ToolOutput> {
        debug!("Executing {}: {}", command.description, command);

        let mut cmd = Command::new(&command.binary_path);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| ConvertError::ToolLaunch {
            tool: command.tool_name().to_string(),
            source: e,
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // Dropping the future drops the child, which kills it
                    warn!("{} exceeded {}s, killed", command.tool_name(), limit.as_secs());
                    return Err(ConvertError::Timeout {
                        tool: command.tool_name().to_string(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!("{} exited with {:?}", command.tool_name(), result.exit_code);
        Ok(result)
    }
}

/// Whether a launch error means the binary is missing rather than broken
pub fn is_not_found(error: &ConvertError) -> bool {
    matches!(error, ConvertError::ToolLaunch { source, .. } if source.kind() == ErrorKind::NotFound)
}
