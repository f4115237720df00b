//! Stream inspection through the probe tool's JSON output.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ConvertError, Result};
use crate::framerate::{FrameRate, KnownFrameRate};
use crate::media::{MediaCommandBuilder, ToolRunner};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    #[serde(default)]
    codec_type: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    Video,
    Audio,
    Subtitle,
    /// Attachments, data streams and anything else the remux ignores
    Other,
}

impl CodecType {
    fn from_probe(value: Option<&str>) -> Self {
        match value {
            Some("video") => CodecType::Video,
            Some("audio") => CodecType::Audio,
            Some("subtitle") => CodecType::Subtitle,
            _ => CodecType::Other,
        }
    }
}

/// One stream of an inspected container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Absolute stream index inside the container, as used by `-map 0:<index>`
    pub index: u32,
    pub codec_type: CodecType,
    pub codec_name: Option<String>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub frame_rate: Option<FrameRate>,
}

/// All streams of one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub streams: Vec<StreamDescriptor>,
}

impl StreamInfo {
    pub fn has(&self, codec_type: CodecType) -> bool {
        self.streams.iter().any(|s| s.codec_type == codec_type)
    }

    pub fn has_audio(&self) -> bool {
        self.has(CodecType::Audio)
    }

    pub fn has_subtitle(&self) -> bool {
        self.has(CodecType::Subtitle)
    }

    pub fn subtitles(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(|s| s.codec_type == CodecType::Subtitle)
    }

    pub fn count(&self, codec_type: CodecType) -> usize {
        self.streams.iter().filter(|s| s.codec_type == codec_type).count()
    }

    /// Frame rate of the first video stream
    pub fn video_frame_rate(&self) -> Option<FrameRate> {
        self.streams
            .iter()
            .find(|s| s.codec_type == CodecType::Video)
            .and_then(|s| s.frame_rate)
    }

    /// Patch tool mapping for the first video stream, `None` if the rate is not in the table
    pub fn known_frame_rate(&self) -> Option<KnownFrameRate> {
        self.video_frame_rate().and_then(KnownFrameRate::from_rate)
    }
}

/// Parse the probe's `-print_format json -show_streams` output
pub fn parse_probe_output(json: &str) -> Result<StreamInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ConvertError::Probe(format!("malformed probe output: {}", e)))?;

    let streams = output
        .streams
        .into_iter()
        .map(|stream| {
            let codec_type = CodecType::from_probe(stream.codec_type.as_deref());
            let frame_rate = if codec_type == CodecType::Video {
                stream
                    .r_frame_rate
                    .as_deref()
                    .and_then(FrameRate::parse)
                    .or_else(|| stream.avg_frame_rate.as_deref().and_then(FrameRate::parse))
            } else {
                None
            };

            StreamDescriptor {
                index: stream.index,
                codec_type,
                codec_name: stream.codec_name,
                language: non_empty(stream.tags.language),
                title: non_empty(stream.tags.title),
                frame_rate,
            }
        })
        .collect();

    Ok(StreamInfo { streams })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Runs the probe tool and turns its output into [`StreamInfo`]
pub struct StreamInspector<'a> {
    runner: &'a dyn ToolRunner,
    builder: &'a MediaCommandBuilder,
}

impl<'a> StreamInspector<'a> {
    pub fn new(runner: &'a dyn ToolRunner, builder: &'a MediaCommandBuilder) -> Self {
        Self { runner, builder }
    }

    pub async fn inspect(&self, input: &Path) -> Result<StreamInfo> {
        let command = self.builder.probe_streams(input);
        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| ConvertError::Probe(e.to_string()))?;

        if !output.success() {
            return Err(ConvertError::Probe(format!(
                "{} exited with {}: {}",
                command.tool_name(),
                crate::error::display_code(&output.exit_code),
                output.error_line()
            )));
        }

        let info = parse_probe_output(&output.stdout)?;
        info!(
            "Inspected {}: {} video, {} audio, {} subtitle stream(s)",
            input.display(),
            info.count(CodecType::Video),
            info.count(CodecType::Audio),
            info.count(CodecType::Subtitle)
        );
        debug!("Streams: {:?}", info.streams);
        Ok(info)
    }
}
