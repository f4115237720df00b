use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ConversionConfig;
use crate::error::display_code;
use crate::media::{MediaCommandBuilder, ToolRunner};
use crate::probe::StreamDescriptor;

/// One subtitle stream scheduled for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleJob {
    pub stream_index: u32,
    pub language: String,
    pub output: PathBuf,
}

/// Which subtitle streams get a sidecar file and where it goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitlePlan {
    pub jobs: Vec<SubtitleJob>,
    /// Streams left out because their language is not allowed or missing
    pub skipped: usize,
}

/// Outcome of running a [`SubtitlePlan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleReport {
    pub extracted: Vec<PathBuf>,
    pub failed: usize,
    pub skipped: usize,
}

/// Select allow-listed subtitle streams and name their sidecars
/// `<base>.<language>.<title-or-placeholder>.srt` inside `subs_dir`.
pub fn plan_subtitles<'a, I>(
    streams: I,
    base_name: &str,
    subs_dir: &Path,
    config: &ConversionConfig,
) -> SubtitlePlan
where
    I: IntoIterator<Item = &'a StreamDescriptor>,
{
    let mut plan = SubtitlePlan::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for stream in streams {
        let Some(language) = stream.language.as_deref() else {
            debug!("Subtitle stream {} has no language tag, skipping", stream.index);
            plan.skipped += 1;
            continue;
        };
        if !config.allows_language(language) {
            debug!("Subtitle stream {} ({}) not in allow-list, skipping", stream.index, language);
            plan.skipped += 1;
            continue;
        }

        let title = stream
            .title
            .as_deref()
            .map(sanitize_component)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| config.untitled_placeholder.clone());
        let stem = format!("{}.{}.{}", base_name, sanitize_component(language), title);

        let count = seen.entry(stem.to_lowercase()).or_insert(0);
        *count += 1;
        let file_name = if *count == 1 {
            format!("{}.srt", stem)
        } else {
            format!("{}.{}.srt", stem, count)
        };

        plan.jobs.push(SubtitleJob {
            stream_index: stream.index,
            language: language.to_string(),
            output: subs_dir.join(file_name),
        });
    }

    plan
}

/// Replace characters that cannot appear in a file name component
pub fn sanitize_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Run one extraction per planned job. Failures are counted, never propagated.
pub async fn extract_subtitles(
    runner: &dyn ToolRunner,
    builder: &MediaCommandBuilder,
    input: &Path,
    plan: &SubtitlePlan,
    overwrite: bool,
) -> SubtitleReport {
    let mut report = SubtitleReport {
        skipped: plan.skipped,
        ..Default::default()
    };

    for job in &plan.jobs {
        let command = builder.extract_subtitle(input, job.stream_index, &job.output, overwrite);
        match runner.run(&command).await {
            Ok(output) if output.success() => {
                info!("Extracted {} subtitles to {}", job.language, job.output.display());
                report.extracted.push(job.output.clone());
            }
            Ok(output) => {
                warn!(
                    "Subtitle stream {} extraction failed with exit code {}: {}",
                    job.stream_index,
                    display_code(&output.exit_code),
                    output.error_line()
                );
                report.failed += 1;
            }
            Err(e) => {
                warn!("Subtitle stream {} extraction failed: {}", job.stream_index, e);
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use crate::media::{MockToolRunner, ToolOutput};
    use crate::probe::CodecType;

    fn sub(index: u32, language: Option<&str>, title: Option<&str>) -> StreamDescriptor {
        StreamDescriptor {
            index,
            codec_type: CodecType::Subtitle,
            codec_name: Some("subrip".to_string()),
            language: language.map(str::to_string),
            title: title.map(str::to_string),
            frame_rate: None,
        }
    }

    fn default_plan(streams: &[StreamDescriptor], dir: &str) -> SubtitlePlan {
        plan_subtitles(streams, "movie", Path::new(dir), &ConversionConfig::default())
    }

    #[test]
    fn test_untitled_stream_uses_placeholder() {
        let streams = [sub(2, Some("eng"), None)];
        let plan = default_plan(&streams, "/out/Subs");

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].output, PathBuf::from("/out/Subs/movie.eng.Undefined.srt"));
        assert_eq!(plan.skipped, 0);
    }

    #[test]
    fn test_disallowed_languages_are_skipped() {
        let streams = [
            sub(2, Some("eng"), Some("Full")),
            sub(3, Some("fre"), None),
            sub(4, None, Some("Signs")),
            sub(5, Some("dut"), Some("Forced")),
        ];
        let plan = default_plan(&streams, "Subs");

        let indices: Vec<_> = plan.jobs.iter().map(|j| j.stream_index).collect();
        assert_eq!(indices, vec![2, 5]);
        assert_eq!(plan.skipped, 2);
        assert!(plan.jobs.iter().all(|j| j.language != "fre"));
    }

    #[test]
    fn test_duplicate_names_get_suffix() {
        let streams = [sub(2, Some("eng"), None), sub(3, Some("eng"), None)];
        let plan = default_plan(&streams, "Subs");

        assert_eq!(plan.jobs[0].output, PathBuf::from("Subs/movie.eng.Undefined.srt"));
        assert_eq!(plan.jobs[1].output, PathBuf::from("Subs/movie.eng.Undefined.2.srt"));
    }

    #[test]
    fn test_title_is_sanitized() {
        let streams = [sub(2, Some("eng"), Some("SDH / Commentary: Director"))];
        let plan = default_plan(&streams, "Subs");

        assert_eq!(
            plan.jobs[0].output,
            PathBuf::from("Subs/movie.eng.SDH _ Commentary_ Director.srt")
        );
        assert_eq!(sanitize_component("..."), "");
    }

    #[tokio::test]
    async fn test_failed_extraction_is_counted() {
        let streams = [
            sub(2, Some("eng"), None),
            sub(3, Some("dut"), None),
            sub(4, Some("ger"), None),
        ];
        let plan = default_plan(&streams, "Subs");

        let mut runner = MockToolRunner::new();
        runner.expect_run().times(2).returning(|cmd| {
            let code = if cmd.args.contains(&"0:3".to_string()) { 1 } else { 0 };
            Ok(ToolOutput { exit_code: Some(code), ..Default::default() })
        });
        let builder = MediaCommandBuilder::new(ToolsConfig::default());

        let report =
            extract_subtitles(&runner, &builder, Path::new("movie.mkv"), &plan, true).await;
        assert_eq!(report.extracted, vec![PathBuf::from("Subs/movie.eng.Undefined.srt")]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
    }
}
