use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ToolsConfig;
use crate::framerate::KnownFrameRate;

/// Abstract external tool invocation: a binary plus an argument list, never a shell string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path_arg(path))
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path_arg(path))
    }

    /// `-y` when overwriting, `-n` otherwise so ffmpeg never stops to prompt
    pub fn overwrite(self, overwrite: bool) -> Self {
        self.arg(if overwrite { "-y" } else { "-n" })
    }

    /// Select a stream with `-map`
    pub fn map<S: Into<String>>(self, selector: S) -> Self {
        self.arg("-map").arg(selector)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Drop chapter metadata
    pub fn strip_chapters(self) -> Self {
        self.arg("-map_chapters").arg("-1")
    }

    /// Move the moov atom to the front for streaming playback
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Name of the binary without its directory, for log and error messages
    pub fn tool_name(&self) -> &str {
        Path::new(&self.binary_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.binary_path)
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary_path)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn path_arg<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().to_string()
}

/// Everything the transcode argument list depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub has_audio: bool,
    pub has_subtitle: bool,
    pub overwrite: bool,
}

/// Builder for the invocations of the three external tools
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    tools: ToolsConfig,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    /// Build the JSON stream probe command
    pub fn probe_streams<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.tools.ffprobe, "Stream probe")
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .output(input)
    }

    /// Build the remux command for `plan`.
    ///
    /// Video and audio are always stream-copied. Subtitle mapping is only added
    /// when the source has at least one subtitle stream; text subtitles are
    /// converted to `mov_text` since MP4 cannot carry SRT/ASS as-is. Chapters are
    /// stripped and the output is laid out for fast start.
    pub fn transcode(&self, plan: &TranscodePlan) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.tools.ffmpeg, "Remux to MP4")
            .arg("-hide_banner")
            .overwrite(plan.overwrite)
            .input(&plan.input)
            .map("0:v?");

        if plan.has_audio {
            cmd = cmd.map("0:a?");
        }
        if plan.has_subtitle {
            cmd = cmd.map("0:s?");
        }

        cmd = cmd.copy_video();
        if plan.has_audio {
            cmd = cmd.copy_audio();
        }
        if plan.has_subtitle {
            cmd = cmd.subtitle_codec("mov_text");
        }

        cmd.strip_chapters()
            .faststart()
            .arg("-strict")
            .arg("unofficial")
            .output(&plan.output)
    }

    /// Build the command writing one subtitle stream to an SRT sidecar
    pub fn extract_subtitle<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        stream_index: u32,
        output: Q,
        overwrite: bool,
    ) -> MediaCommand {
        let description = format!("Subtitle extraction (stream {})", stream_index);
        MediaCommand::new(&self.tools.ffmpeg, description)
            .arg("-hide_banner")
            .overwrite(overwrite)
            .input(input)
            .map(format!("0:{}", stream_index))
            .subtitle_codec("srt")
            .output(output)
    }

    /// Build the in-place timestamp rewrite for the first track of `mp4`
    pub fn patch_framerate<P: AsRef<Path>>(&self, rate: KnownFrameRate, mp4: P) -> MediaCommand {
        MediaCommand::new(&self.tools.mp4fpsmod, "Frame rate patch")
            .arg("-r")
            .arg(format!("0:{}", rate.fraction()))
            .arg("-i")
            .output(mp4)
    }

    /// Build version check command for any binary
    pub fn version_check<S: Into<String>>(&self, binary_path: S, flag: &str) -> MediaCommand {
        MediaCommand::new(binary_path, "Version check").arg(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(has_audio: bool, has_subtitle: bool) -> TranscodePlan {
        TranscodePlan {
            input: PathBuf::from("/media/movie.mkv"),
            output: PathBuf::from("/media/Converted/movie.mp4"),
            has_audio,
            has_subtitle,
            overwrite: true,
        }
    }

    fn transcode_args(plan: &TranscodePlan) -> Vec<String> {
        MediaCommandBuilder::new(ToolsConfig::default()).transcode(plan).args
    }

    #[test]
    fn test_transcode_args_full_layout() {
        let args = transcode_args(&plan(true, true));
        assert_eq!(
            args,
            vec![
                "-hide_banner", "-y", "-i", "/media/movie.mkv",
                "-map", "0:v?", "-map", "0:a?", "-map", "0:s?",
                "-c:v", "copy", "-c:a", "copy", "-c:s", "mov_text",
                "-map_chapters", "-1", "-movflags", "+faststart",
                "-strict", "unofficial", "/media/Converted/movie.mp4",
            ]
        );
    }

    #[test]
    fn test_subtitle_flags_follow_presence() {
        for has_audio in [false, true] {
            let without = transcode_args(&plan(has_audio, false));
            assert!(!without.iter().any(|a| a == "-c:s"));
            assert!(!without.iter().any(|a| a == "0:s?"));

            let with = transcode_args(&plan(has_audio, true));
            assert!(with.iter().any(|a| a == "-c:s"));
            assert!(with.iter().any(|a| a == "0:s?"));
        }
    }

    #[test]
    fn test_transcode_args_never_reencode() {
        let args = transcode_args(&plan(false, false));
        let video_codec = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[video_codec + 1], "copy");
        assert!(!args.iter().any(|a| a == "-c:a"));
        assert_eq!(args.last().unwrap(), "/media/Converted/movie.mp4");
    }

    #[test]
    fn test_transcode_args_are_deterministic() {
        let p = plan(true, true);
        assert_eq!(transcode_args(&p), transcode_args(&p));
    }

    #[test]
    fn test_no_overwrite_uses_n_flag() {
        let mut p = plan(true, false);
        p.overwrite = false;
        let args = transcode_args(&p);
        assert_eq!(args[1], "-n");
    }

    #[test]
    fn test_transcode_command_runs_configured_ffmpeg() {
        let tools = ToolsConfig {
            ffmpeg: "/opt/ffmpeg/bin/ffmpeg".to_string(),
            ..ToolsConfig::default()
        };
        let cmd = MediaCommandBuilder::new(tools).transcode(&plan(true, false));
        assert_eq!(cmd.binary_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(cmd.tool_name(), "ffmpeg");
        assert_eq!(cmd.args.first().unwrap(), "-hide_banner");
        assert_eq!(cmd.args.last().unwrap(), "/media/Converted/movie.mp4");
    }

    #[test]
    fn test_probe_command_requests_json() {
        let builder = MediaCommandBuilder::new(ToolsConfig::default());
        let cmd = builder.probe_streams("/media/movie.mkv");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert!(cmd.args.windows(2).any(|w| w == ["-print_format", "json"]));
        assert!(cmd.args.contains(&"-show_streams".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "/media/movie.mkv");
    }

    #[test]
    fn test_patch_command_uses_fraction() {
        let builder = MediaCommandBuilder::new(ToolsConfig::default());
        let cmd = builder.patch_framerate(KnownFrameRate::Fps23_976, "/out/movie.mp4");
        assert_eq!(cmd.binary_path, "mp4fpsmod");
        assert_eq!(cmd.args, vec!["-r", "0:24000/1001", "-i", "/out/movie.mp4"]);
    }

    #[test]
    fn test_subtitle_command_maps_single_stream() {
        let builder = MediaCommandBuilder::new(ToolsConfig::default());
        let cmd =
            builder.extract_subtitle("/in/a b.mkv", 3, "/out/Subs/a b.eng.Undefined.srt", true);
        assert!(cmd.args.windows(2).any(|w| w == ["-map", "0:3"]));
        assert!(cmd.args.contains(&"/in/a b.mkv".to_string()));
        assert_eq!(cmd.to_string().matches('"').count(), 4);
    }

    #[test]
    fn test_tool_name_strips_directory() {
        let cmd = MediaCommand::new("/opt/bin/ffmpeg", "x");
        assert_eq!(cmd.tool_name(), "ffmpeg");
    }
}
