use clap::Parser;
use std::path::PathBuf;

/// Remux MKV files to MP4 without re-encoding, with frame rate patching and
/// subtitle sidecars.
///
/// Without INPUT every matching file in the scan directory is converted.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Single file to convert
    pub input: Option<PathBuf>,

    /// Directory to scan when no INPUT is given (default: current directory)
    #[arg(short, long, conflicts_with = "input")]
    pub dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not rewrite frame rate metadata of the produced files
    #[arg(long)]
    pub no_patch: bool,

    /// Do not extract subtitle sidecar files
    #[arg(long)]
    pub no_subs: bool,

    /// Subtitle languages to extract (comma-separated ISO 639-2 tags)
    #[arg(short, long)]
    pub languages: Option<String>,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub pause: bool,

    /// Write the effective configuration to this file and exit
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// Parsed `--languages`, empty entries dropped
    pub fn language_list(&self) -> Option<Vec<String>> {
        self.languages.as_ref().map(|langs| {
            langs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }
}
