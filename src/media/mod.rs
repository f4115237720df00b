// Modular media tool execution
//
// This module separates what is run from how it is run:
// - Commands: argument-list builders for ffmpeg, ffprobe and mp4fpsmod
// - Processor: the subprocess-backed runner used outside of tests

pub mod commands;
pub mod processor;

use async_trait::async_trait;

pub use commands::*;
pub use processor::*;

use crate::config::ToolsConfig;
use crate::error::Result;

/// Captured result of a finished tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty stderr line, which is where ffmpeg puts the actual error
    pub fn error_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

/// Runs one external tool to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Execute the command and capture its output.
    ///
    /// A non-zero exit is not an error here; only failing to launch the
    /// process or exceeding the configured timeout is.
    async fn run(&self, command: &MediaCommand) -> Result<ToolOutput>;
}

/// Factory for creating tool runner instances
pub struct ToolRunnerFactory;

impl ToolRunnerFactory {
    /// Create the default subprocess-backed runner
    pub fn create_runner(tools: &ToolsConfig) -> Box<dyn ToolRunner> {
        Box::new(processor::SystemToolRunner::new(tools.timeout()))
    }
}
