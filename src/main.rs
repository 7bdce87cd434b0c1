//! vidtools - video file maintenance from the command line
//!
//! Dispatches each subcommand to the library workflow, prints results on
//! stdout and maps failures to process exit codes.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidtools::cli::{Args, Commands};
use vidtools::config::Config;
use vidtools::error::VidToolsError;
use vidtools::media::AudioOptions;
use vidtools::paths::require_file;
use vidtools::probe::ProbeReport;
use vidtools::transcribe::TranscribeOptions;
use vidtools::workflow::Workflow;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_code(&e));
        }
    };

    if let Err(e) = setup_logging(args.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::from(1);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<VidToolsError>()
                .map_or(1, VidToolsError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

/// `--help` and `--version` arrive as clap errors but are successful runs
fn parse_error_code(e: &clap::Error) -> u8 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

async fn run(args: Args) -> Result<()> {
    // init-config must work even when the existing config is broken
    if let Commands::InitConfig { output, force } = &args.command {
        return init_config(output, *force);
    }

    let config = Config::load(args.config.as_deref())?;
    config.validate()?;
    let mut style = config.style.clone();
    let workflow = Workflow::new(config);

    match args.command {
        Commands::StripMetadata { inputs, output_dir } => {
            let outcome = workflow.strip_metadata(&inputs, output_dir.as_deref()).await?;
            for output in &outcome.completed {
                println!("{}", output.display());
            }
            outcome.ensure_success()?;
        }
        Commands::SetComment { inputs, comment, output_dir } => {
            let outcome = workflow
                .set_comment(&inputs, comment.as_deref(), output_dir.as_deref())
                .await?;
            for tagged in &outcome.completed {
                println!("{}\t{}", tagged.output.display(), tagged.comment);
            }
            outcome.ensure_success()?;
        }
        Commands::ExtractAudio { input, output, format, sample_rate, mono } => {
            let options = AudioOptions { format, sample_rate, mono };
            let output = workflow.extract_audio(&input, output.as_deref(), &options).await?;
            println!("{}", output.display());
        }
        Commands::Transcribe { input, output, format, whisper } => {
            info!("Transcribing: {}", input.display());
            let options = TranscribeOptions::resolve(&workflow.config().transcriber, whisper.model, whisper.language);
            let output = workflow.transcribe(&input, output.as_deref(), format, &options).await?;
            println!("{}", output.display());
        }
        Commands::Info { input, json } => {
            if json {
                println!("{}", workflow.probe_raw(&input).await?.trim_end());
            } else {
                println!("{}", workflow.probe(&input).await?.render());
            }
        }
        Commands::ParseMetadata { json_file } => {
            let json = read_json_input(json_file.as_deref()).await?;
            println!("{}", ProbeReport::parse(&json)?.render());
        }
        Commands::Checksum { inputs, algorithm, json } => {
            let outcome = workflow.checksums(&inputs, algorithm).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.completed)?);
            } else {
                for report in &outcome.completed {
                    println!("{}", report.render());
                }
            }
            outcome.ensure_success()?;
        }
        Commands::DetectWatermark { inputs, samples, json } => {
            let outcome = workflow.detect_watermarks(&inputs, samples).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.completed)?);
            } else {
                for report in &outcome.completed {
                    println!("{}", report.render());
                }
            }
            outcome.ensure_success()?;
        }
        Commands::BurnSubtitles { input, srt, output, style: overrides } => {
            overrides.apply_to(&mut style);
            style.force_style()?;
            let output = workflow
                .burn_subtitles(&input, srt.as_deref(), output.as_deref(), &style)
                .await?;
            println!("{}", output.display());
        }
        Commands::Caption { input, output, whisper, style: overrides } => {
            overrides.apply_to(&mut style);
            style.force_style()?;
            let options = TranscribeOptions::resolve(&workflow.config().transcriber, whisper.model, whisper.language);
            let outcome = workflow.caption(&input, &options, output.as_deref(), &style).await?;
            println!("{}", outcome.subtitle_path.display());
            println!("{}", outcome.video_path.display());
        }
        Commands::Check => {
            let statuses = workflow.check_tools().await;
            for status in &statuses {
                let mark = if status.available { "ok" } else { "missing" };
                println!("{:<16} {:<8} {}", status.name, mark, status.detail.lines().next().unwrap_or_default());
            }
            let missing = statuses.iter().filter(|s| !s.available).count();
            if missing > 0 {
                anyhow::bail!("{} of {} tools unavailable", missing, statuses.len());
            }
        }
        Commands::InitConfig { .. } => unreachable!("handled before loading the configuration"),
    }

    Ok(())
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(VidToolsError::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        ))
        .into());
    }

    Config::default().save_to_file(output)?;
    info!("Configuration written to {}", output.display());
    println!("{}", output.display());
    Ok(())
}

async fn read_json_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            require_file(path)?;
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut json = String::new();
            tokio::io::stdin()
                .read_to_string(&mut json)
                .await
                .context("Failed to read ffprobe JSON from stdin")?;
            Ok(json)
        }
    }
}

/// Setup logging to stderr and a daily log file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".vidtools").join("log");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = rolling::daily(&log_dir, "vidtools.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    // stdout carries command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(log_filter(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - file: {}", log_dir.join("vidtools.log").display());
    Ok(())
}

/// `RUST_LOG` wins when set and valid; otherwise INFO, or DEBUG with `--verbose`
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.to_string()))
}
