//! Subextract - Embedded Subtitle Extraction
//!
//! Command-line entry point: single-file and batch extraction, stream
//! probing, and the JSON hooks a media library host calls.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use subextract::cli::{Args, Commands, HookKind, parse_path_list};
use subextract::config::{Config, LoggingConfig};
use subextract::discover::{FfmpegStreamDiscoverer, StreamDiscoverer};
use subextract::extract::{StreamStatus, output_path};
use subextract::hooks;
use subextract::job::ExtractionJob;
use subextract::media::MediaProcessorFactory;
use subextract::report::{BatchReport, ExtractionStatus};
use subextract::reporter::{ProgressReporter, TracingReporter};
use subextract::workflow::{Workflow, find_video_files};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config_path = Config::locate(args.config.as_deref());
    let config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Keep the file writer alive until exit
    let _log_guard = setup_logging(args.verbose, &config.logging)?;
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }

    let cancelled = cancel_on_interrupt();

    match args.command {
        Commands::Extract { input, output_dir } => {
            let workflow = Workflow::new(&config, Arc::new(TracingReporter))
                .with_output_dir(output_dir.or(config.extraction.output_dir.clone()))
                .with_cancel_flag(cancelled);

            let result = workflow.process_one(&input).await;
            for stream in &result.streams {
                let status = match stream.status {
                    StreamStatus::Extracted => "ok",
                    StreamStatus::Failed => "failed",
                };
                println!(
                    "{:<8} {:<6} {:<8} {}",
                    status,
                    stream.index,
                    stream.language,
                    stream.output.display()
                );
            }

            if result.status == ExtractionStatus::Error {
                bail!(
                    "{}: {}",
                    input.display(),
                    result.message.unwrap_or_default()
                );
            }
            info!("{}: {}", input.display(), result.message.unwrap_or_default());
        }
        Commands::Batch { inputs, list, dir, output_dir, json } => {
            let mut paths = inputs;
            if let Some(list) = list {
                let content = tokio::fs::read_to_string(&list).await?;
                paths.extend(parse_path_list(&content));
            }
            if let Some(dir) = dir {
                paths.extend(find_video_files(&dir, &config.extraction.video_extensions)?);
            }
            if paths.is_empty() {
                bail!("No input files given; pass paths, --list or --dir");
            }

            info!("Processing {} video file(s)", paths.len());
            let workflow = Workflow::new(&config, Arc::new(TracingReporter))
                .with_output_dir(output_dir.or(config.extraction.output_dir.clone()))
                .with_cancel_flag(cancelled);

            let report = if json {
                workflow.process_many(&paths).await
            } else {
                let progress = Arc::new(ProgressReporter::new(paths.len() as u64));
                let report = workflow
                    .with_reporter(progress.clone())
                    .process_many(&paths)
                    .await;
                progress.finish();
                report
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if report.failed() > 0 {
                bail!("{} of {} file(s) failed", report.failed(), report.results.len());
            }
        }
        Commands::Probe { input } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            let discoverer = FfmpegStreamDiscoverer::new(media);
            let streams = discoverer.discover(&input).await?;
            let job = ExtractionJob::resolve(&input, config.extraction.output_dir.as_deref())?;

            if streams.is_empty() {
                println!("No subtitle streams found in {}", input.display());
            } else {
                println!("{:<8} {:<10} {}", "Stream", "Language", "Output");
                println!("{}", "-".repeat(60));
                for stream in &streams {
                    println!(
                        "{:<8} {:<10} {}",
                        stream.index,
                        stream.language_tag(),
                        output_path(&job, stream).display()
                    );
                }
            }
        }
        Commands::Hook { kind } => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;

            let workflow =
                Workflow::new(&config, Arc::new(TracingReporter)).with_cancel_flag(cancelled);

            let response = match kind {
                HookKind::Scan => serde_json::to_string(&hooks::on_scan_json(&workflow, &input).await)?,
                HookKind::Retroactive => {
                    serde_json::to_string(&hooks::on_retroactive_json(&workflow, &input).await)?
                }
            };
            println!("{}", response);
        }
        Commands::Check => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability().await?;
            println!("{}", media.get_version_info().await?);
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                bail!("{} already exists", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Flag set on Ctrl-C; workflows stop at the next file or stream boundary
fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current stream");
            flag.store(true, Ordering::SeqCst);
        }
    });
    cancelled
}

fn print_report(report: &BatchReport) {
    println!("\n{:<8} {:<60} {}", "Status", "File", "Message");
    println!("{}", "-".repeat(100));
    for result in &report.results {
        let status = match result.status {
            ExtractionStatus::Ok => "ok",
            ExtractionStatus::Error => "error",
        };
        println!(
            "{:<8} {:<60} {}",
            status,
            display_name(&result.source_path),
            result.message.as_deref().unwrap_or_default()
        );
    }
    println!(
        "\n{} file(s) ok, {} failed, {} subtitle file(s) written",
        report.succeeded(),
        report.failed(),
        report.extracted_streams()
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Console logging on stderr (stdout carries command output), plus a
/// daily-rolling file when a log directory is configured
fn setup_logging(verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let (file_layer, guard) = match &logging.directory {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = rolling::daily(log_dir, "subextract.log");
            let (non_blocking_file, guard) = non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
