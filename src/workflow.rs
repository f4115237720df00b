use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{display_code, ConvertError, Result};
use crate::framerate::KnownFrameRate;
use crate::media::{MediaCommandBuilder, ToolRunner, TranscodePlan};
use crate::probe::{StreamInfo, StreamInspector};
use crate::progress;
use crate::scanner::{has_extension, scan_directory, MediaFile};
use crate::subtitle::{extract_subtitles, plan_subtitles, SubtitleReport};

/// Where converted files of one root directory go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub output_dir: PathBuf,
    pub subtitle_dir: PathBuf,
}

impl OutputLayout {
    pub fn for_root<P: AsRef<Path>>(root: P, config: &Config) -> Self {
        let output_dir = root.as_ref().join(&config.conversion.output_dir);
        let subtitle_dir = output_dir.join(&config.conversion.subtitle_dir);
        Self { output_dir, subtitle_dir }
    }

    pub fn mp4_path(&self, file: &MediaFile) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", file.base_name))
    }
}

/// Files produced for one successfully converted input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub mp4: PathBuf,
    pub subtitles: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSkipReason {
    Disabled,
    NoVideoStream,
    /// Rate outside the known table, rendered as `num/den`
    UnknownRate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    Patched(KnownFrameRate),
    Skipped(PatchSkipReason),
    /// The MP4 keeps its original timestamps
    Failed(String),
}

/// Terminal state of one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped { reason: String },
    ProbeFailed { error: String },
    TranscodeFailed { exit_code: Option<i32>, error: String },
    Done {
        artifact: OutputArtifact,
        patch: PatchStatus,
        subtitles: SubtitleReport,
    },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Done { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::ProbeFailed { .. } | FileOutcome::TranscodeFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub input: PathBuf,
    pub outcome: FileOutcome,
}

/// Result accumulator of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn record(&mut self, input: &Path, outcome: FileOutcome) {
        if outcome.is_success() {
            self.successful += 1;
        } else if outcome.is_failure() {
            self.failed += 1;
        } else {
            self.skipped += 1;
        }
        self.files.push(FileReport {
            input: input.to_path_buf(),
            outcome,
        });
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.files.iter().filter_map(|report| match &report.outcome {
            FileOutcome::Done { artifact, .. } => Some(artifact),
            _ => None,
        })
    }

    pub fn patch_failures(&self) -> usize {
        self.files
            .iter()
            .filter(|r| {
                matches!(r.outcome, FileOutcome::Done { patch: PatchStatus::Failed(_), .. })
            })
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "All done. Successfully converted {} files, {} files failed.",
            self.successful, self.failed
        )
    }
}

/// Sequential MKV to MP4 conversion pipeline
pub struct Converter {
    config: Config,
    runner: Box<dyn ToolRunner>,
    builder: MediaCommandBuilder,
}

impl Converter {
    pub fn with_runner(config: Config, runner: Box<dyn ToolRunner>) -> Self {
        let builder = MediaCommandBuilder::new(config.tools.clone());
        Self { config, runner, builder }
    }

    /// Convert every matching file directly inside `dir`
    pub async fn convert_directory<P: AsRef<Path>>(&self, dir: P) -> Result<RunSummary> {
        let dir = dir.as_ref();
        info!("Processing directory: {}", dir.display());

        let files = scan_directory(dir, self.config.input_extension())?;
        let layout = OutputLayout::for_root(dir, &self.config);
        let mut summary = RunSummary::default();

        let pb = progress::batch_bar(files.len() as u64, progress::stderr_is_interactive());

        for file in &files {
            pb.set_message(file.file_name());
            let outcome = self.convert_file(file, &layout).await;
            summary.record(&file.path, outcome);
            pb.inc(1);
        }
        progress::finish(&pb);

        info!("{}", summary);
        Ok(summary)
    }

    /// Convert one file; its parent directory is the output root.
    ///
    /// A nonexistent path is an error. A file with the wrong extension is
    /// recorded as skipped.
    pub async fn convert_single<P: AsRef<Path>>(&self, input: P) -> Result<RunSummary> {
        let input = input.as_ref();
        if !input.is_file() {
            return Err(ConvertError::FileNotFound(input.display().to_string()));
        }

        let file = MediaFile::new(input)?;
        let layout = OutputLayout::for_root(&file.directory, &self.config);
        let mut summary = RunSummary::default();
        let outcome = self.convert_file(&file, &layout).await;
        summary.record(&file.path, outcome);

        info!("{}", summary);
        Ok(summary)
    }

    /// Run the full pipeline for one file. Never fails: every error ends up in the outcome.
    pub async fn convert_file(&self, file: &MediaFile, layout: &OutputLayout) -> FileOutcome {
        let extension = self.config.input_extension();
        if !has_extension(&file.path, extension) {
            let skip = ConvertError::UnsupportedFormat(format!(
                "not an {} file",
                extension.to_uppercase()
            ));
            warn!("Skipping {}. {}", file.file_name(), skip);
            return FileOutcome::Skipped { reason: skip.to_string() };
        }

        info!("Converting {}", file.path.display());

        let inspector = StreamInspector::new(self.runner.as_ref(), &self.builder);
        let streams = match inspector.inspect(&file.path).await {
            Ok(streams) => streams,
            Err(e) => {
                warn!("Cannot inspect {}: {}", file.file_name(), e);
                return FileOutcome::ProbeFailed { error: e.to_string() };
            }
        };

        if let Err(e) = fs::create_dir_all(&layout.output_dir).await {
            warn!("Cannot create {}: {}", layout.output_dir.display(), e);
            return FileOutcome::TranscodeFailed { exit_code: None, error: e.to_string() };
        }

        let mp4 = layout.mp4_path(file);
        if let Err(e) = self.transcode(file, &streams, &mp4).await {
            warn!("Remux of {} failed: {}", file.file_name(), e);
            let exit_code = match &e {
                ConvertError::Transcode { exit_code } => *exit_code,
                _ => None,
            };
            return FileOutcome::TranscodeFailed { exit_code, error: e.to_string() };
        }
        info!("Conversion of file complete. Output file: {}", mp4.display());

        let patch = self.patch_framerate(&streams, &mp4).await;
        let subtitles = self.extract_subtitles(file, &streams, layout).await;

        FileOutcome::Done {
            artifact: OutputArtifact {
                mp4,
                subtitles: subtitles.extracted.clone(),
            },
            patch,
            subtitles,
        }
    }

    async fn transcode(&self, file: &MediaFile, streams: &StreamInfo, mp4: &Path) -> Result<()> {
        if streams.has_subtitle() {
            info!("Subtitle stream(s) detected: {}", streams.subtitles().count());
        }

        let plan = TranscodePlan {
            input: file.path.clone(),
            output: mp4.to_path_buf(),
            has_audio: streams.has_audio(),
            has_subtitle: streams.has_subtitle(),
            overwrite: self.config.conversion.overwrite,
        };
        let command = self.builder.transcode(&plan);
        let output = self.runner.run(&command).await?;

        if !output.success() {
            warn!(
                "{} exited with {}: {}",
                command.tool_name(),
                display_code(&output.exit_code),
                output.error_line()
            );
            return Err(ConvertError::Transcode { exit_code: output.exit_code });
        }
        Ok(())
    }

    async fn patch_framerate(&self, streams: &StreamInfo, mp4: &Path) -> PatchStatus {
        if !self.config.conversion.patch_framerate {
            return PatchStatus::Skipped(PatchSkipReason::Disabled);
        }
        let Some(rate) = streams.video_frame_rate() else {
            return PatchStatus::Skipped(PatchSkipReason::NoVideoStream);
        };
        let Some(known) = KnownFrameRate::from_rate(rate) else {
            info!("Frame rate {} has no patch mapping, leaving timestamps as-is", rate);
            return PatchStatus::Skipped(PatchSkipReason::UnknownRate(rate.to_string()));
        };

        let command = self.builder.patch_framerate(known, mp4);
        let result = match self.runner.run(&command).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(ConvertError::Patch(format!(
                "{} exited with {}: {}",
                command.tool_name(),
                display_code(&output.exit_code),
                output.error_line()
            ))),
            Err(e) => Err(ConvertError::Patch(e.to_string())),
        };

        match result {
            Ok(()) => {
                info!("Patched {} to {} fps", mp4.display(), known);
                PatchStatus::Patched(known)
            }
            Err(e) => {
                warn!("{} (output kept with original timestamps)", e);
                PatchStatus::Failed(e.to_string())
            }
        }
    }

    async fn extract_subtitles(
        &self,
        file: &MediaFile,
        streams: &StreamInfo,
        layout: &OutputLayout,
    ) -> SubtitleReport {
        let conversion = &self.config.conversion;
        if !conversion.extract_subtitles {
            return SubtitleReport {
                skipped: streams.subtitles().count(),
                ..Default::default()
            };
        }

        let plan = plan_subtitles(
            streams.subtitles(),
            &file.base_name,
            &layout.subtitle_dir,
            conversion,
        );
        if plan.jobs.is_empty() {
            return SubtitleReport {
                skipped: plan.skipped,
                ..Default::default()
            };
        }

        if let Err(e) = fs::create_dir_all(&layout.subtitle_dir).await {
            warn!("Cannot create {}: {}", layout.subtitle_dir.display(), e);
            return SubtitleReport {
                failed: plan.jobs.len(),
                skipped: plan.skipped,
                ..Default::default()
            };
        }

        extract_subtitles(
            self.runner.as_ref(),
            &self.builder,
            &file.path,
            &plan,
            conversion.overwrite,
        )
        .await
    }
}
