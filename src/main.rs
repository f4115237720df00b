//! mkvtomp4 - Batch MKV to MP4 remuxing
//!
//! Entry point: parses the command line, sets up logging and configuration,
//! checks the external tools and runs the conversion in batch or single-file
//! mode.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mkvtomp4::cli::Args;
use mkvtomp4::config::Config;
use mkvtomp4::media::ToolRunnerFactory;
use mkvtomp4::progress::ConsoleWriter;
use mkvtomp4::setup::ensure_tools;
use mkvtomp4::workflow::{Converter, FileOutcome, RunSummary};

const DEFAULT_CONFIG: &str = "mkvtomp4.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Held until exit so buffered file logs get flushed
    let _guard = setup_logging(args.verbose)?;

    let mut config = load_config(&args)?;

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let runner = ToolRunnerFactory::create_runner(&config.tools);
    ensure_tools(runner.as_ref(), &mut config).await?;
    let converter = Converter::with_runner(config, runner);

    let summary = match &args.input {
        Some(input) => {
            info!("Single-file mode: {}", input.display());
            converter.convert_single(input).await?
        }
        None => {
            let dir = match &args.dir {
                Some(dir) => dir.clone(),
                None => std::env::current_dir()?,
            };
            converter.convert_directory(&dir).await?
        }
    };

    print_summary(&summary);

    if args.pause {
        wait_for_enter().await?;
    }

    Ok(())
}

/// Load the configuration file and apply command line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    if args.no_patch {
        config.conversion.patch_framerate = false;
    }
    if args.no_subs {
        config.conversion.extract_subtitles = false;
    }
    if let Some(languages) = args.language_list() {
        config.conversion.subtitle_languages = languages;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(summary: &RunSummary) {
    for report in &summary.files {
        let name = report.input.display();
        match &report.outcome {
            FileOutcome::Skipped { reason } => println!("Skipping {}. {}", name, reason),
            FileOutcome::ProbeFailed { error } => println!("Error: {}: {}", name, error),
            FileOutcome::TranscodeFailed { error, .. } => println!("Error: {}: {}", name, error),
            FileOutcome::Done { artifact, subtitles, .. } => {
                println!("Converted {} -> {}", name, artifact.mp4.display());
                if subtitles.failed > 0 {
                    warn!(
                        "{} subtitle stream(s) of {} could not be extracted",
                        subtitles.failed, name
                    );
                }
            }
        }
    }
    if summary.patch_failures() > 0 {
        println!(
            "{} file(s) kept their original frame rate metadata",
            summary.patch_failures()
        );
    }
    println!("{}", summary);
}

async fn wait_for_enter() -> Result<()> {
    println!("Press Enter to finish...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir: PathBuf = std::env::current_dir()?.join(".mkvtomp4").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "mkvtomp4.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(|| ConsoleWriter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("mkvtomp4.log").display()
    );

    Ok(guard)
}
