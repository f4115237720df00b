use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, ConvertError};

fn default_input_extension() -> String {
    "mkv".to_string()
}

fn default_output_dir() -> String {
    "Converted".to_string()
}

fn default_subtitle_dir() -> String {
    "Subs".to_string()
}

fn default_subtitle_languages() -> Vec<String> {
    vec!["eng".to_string(), "dut".to_string()]
}

fn default_untitled_placeholder() -> String {
    "Undefined".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the transcode binary
    pub ffmpeg: String,
    /// Path to the stream probing binary
    pub ffprobe: String,
    /// Path to the frame rate patching binary
    pub mp4fpsmod: String,
    /// Upper bound for a single tool invocation, 0 waits forever
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Container extension picked up by the scanner (case-insensitive)
    #[serde(default = "default_input_extension")]
    pub input_extension: String,
    /// Output directory, relative to the scanned root
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Sidecar subtitle directory, relative to the output directory
    #[serde(default = "default_subtitle_dir")]
    pub subtitle_dir: String,
    /// Subtitle languages (ISO 639-2 tags) that get extracted
    #[serde(default = "default_subtitle_languages")]
    pub subtitle_languages: Vec<String>,
    /// Used in sidecar names when a stream carries no title
    #[serde(default = "default_untitled_placeholder")]
    pub untitled_placeholder: String,
    /// Overwrite existing outputs instead of failing on them
    #[serde(default = "default_true")]
    pub overwrite: bool,
    #[serde(default = "default_true")]
    pub patch_framerate: bool,
    #[serde(default = "default_true")]
    pub extract_subtitles: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            mp4fpsmod: "mp4fpsmod".to_string(),
            timeout_secs: 0,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_extension: default_input_extension(),
            output_dir: default_output_dir(),
            subtitle_dir: default_subtitle_dir(),
            subtitle_languages: default_subtitle_languages(),
            untitled_placeholder: default_untitled_placeholder(),
            overwrite: true,
            patch_framerate: true,
            extract_subtitles: true,
        }
    }
}

impl ConversionConfig {
    pub fn allows_language(&self, language: &str) -> bool {
        self.subtitle_languages
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(language))
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConvertError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConvertError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConvertError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let conversion = &self.conversion;
        if conversion.input_extension.trim_start_matches('.').is_empty() {
            return Err(ConvertError::Config("input_extension must not be empty".to_string()));
        }
        if conversion.input_extension.eq_ignore_ascii_case("mp4") {
            return Err(ConvertError::Config(
                "input_extension must differ from the mp4 output".to_string(),
            ));
        }
        for (name, value) in [
            ("output_dir", &conversion.output_dir),
            ("subtitle_dir", &conversion.subtitle_dir),
        ] {
            if value.is_empty() || Path::new(value).is_absolute() {
                return Err(ConvertError::Config(format!(
                    "{} must be a non-empty relative path, got '{}'",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Container extension without a leading dot.
    pub fn input_extension(&self) -> &str {
        self.conversion.input_extension.trim_start_matches('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_layout() {
        let config = Config::default();
        assert_eq!(config.input_extension(), "mkv");
        assert_eq!(config.conversion.output_dir, "Converted");
        assert_eq!(config.conversion.subtitle_dir, "Subs");
        assert_eq!(config.conversion.untitled_placeholder, "Undefined");
        assert!(config.tools.timeout().is_none());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [conversion]
            subtitle_languages = ["jpn"]
            "#,
        )
        .unwrap();

        assert_eq!(config.tools.ffmpeg, "ffmpeg");
        assert_eq!(config.conversion.output_dir, "Converted");
        assert!(config.conversion.allows_language("JPN"));
        assert!(!config.conversion.allows_language("eng"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mkvtomp4.toml");

        let mut config = Config::default();
        config.tools.timeout_secs = 90;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.tools.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(loaded.conversion.subtitle_languages, vec!["eng", "dut"]);
    }

    #[test]
    fn test_rejects_absolute_output_dir() {
        let mut config = Config::default();
        config.conversion.output_dir = "/tmp/out".to_string();
        assert!(matches!(config.validate(), Err(ConvertError::Config(_))));
    }
}
