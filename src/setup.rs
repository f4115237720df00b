use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::media::{is_not_found, MediaCommandBuilder, ToolRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: &'static str,
    pub binary_path: String,
    /// First line of the version output, `None` if the tool could not be started
    pub version: Option<String>,
}

impl ToolInfo {
    pub fn available(&self) -> bool {
        self.version.is_some()
    }
}

/// Query one tool for its version. Any tool that launches counts as present,
/// whatever its exit code; mp4fpsmod exits non-zero when printing usage.
pub async fn check_tool(
    runner: &dyn ToolRunner,
    builder: &MediaCommandBuilder,
    name: &'static str,
    binary_path: &str,
    flag: &str,
) -> ToolInfo {
    let command = builder.version_check(binary_path, flag);
    let version = match runner.run(&command).await {
        Ok(output) => {
            let text = if output.stdout.trim().is_empty() {
                &output.stderr
            } else {
                &output.stdout
            };
            Some(
                text.lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("unknown version")
                    .to_string(),
            )
        }
        Err(e) => {
            if is_not_found(&e) {
                warn!("{} not found at '{}'", name, binary_path);
            } else {
                warn!("{} could not be started: {}", name, e);
            }
            None
        }
    };

    ToolInfo {
        name,
        binary_path: binary_path.to_string(),
        version,
    }
}

/// Make sure the tools are usable before a run.
///
/// The remux and probe tools are mandatory. A missing patch tool only turns
/// frame rate patching off.
pub async fn ensure_tools(runner: &dyn ToolRunner, config: &mut Config) -> Result<Vec<ToolInfo>> {
    let builder = MediaCommandBuilder::new(config.tools.clone());
    let tools = &config.tools;

    let mut found = vec![
        check_tool(runner, &builder, "ffmpeg", &tools.ffmpeg, "-version").await,
        check_tool(runner, &builder, "ffprobe", &tools.ffprobe, "-version").await,
    ];
    if config.conversion.patch_framerate {
        found.push(check_tool(runner, &builder, "mp4fpsmod", &tools.mp4fpsmod, "--help").await);
    }

    for tool in &found {
        match &tool.version {
            Some(version) => info!("{}: {}", tool.name, version),
            None if tool.name == "mp4fpsmod" => {
                warn!("mp4fpsmod unavailable, frame rate patching disabled");
                config.conversion.patch_framerate = false;
            }
            None => {
                return Err(ConvertError::Config(format!(
                    "{} is required but '{}' could not be run",
                    tool.name, tool.binary_path
                )));
            }
        }
    }

    Ok(found)
}
