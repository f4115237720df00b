use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Transcode failed with exit code {}", display_code(.exit_code))]
    Transcode { exit_code: Option<i32> },

    #[error("Frame rate patch failed: {0}")]
    Patch(String),

    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },
}

/// Render an exit code; `None` means the process was killed by a signal.
pub fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
