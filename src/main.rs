//! Dubflow - Guided Video Dubbing Workflow
//!
//! Command line entry point. Runs the upload, language, processing and
//! download steps headless against the configured backend.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubflow::cli::{Args, Commands};
use dubflow::config::Config;
use dubflow::processing::BackendClient;
use dubflow::steps::SUPPORTED_LANGUAGES;
use dubflow::wizard::{Wizard, WizardOptions, WizardOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting Dubflow - Guided Video Dubbing Workflow");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("dubflow.toml").exists() {
                info!("Found dubflow.toml in current directory, loading...");
                Config::from_file("dubflow.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env();
    config.validate()?;
    info!("Backend: {}", config.api.base_url);

    match args.command {
        Commands::Run { input, target, media_type, output_dir, no_download } => {
            info!("Dubbing {} into {}", input.display(), target);

            let options = WizardOptions {
                input,
                target_language: target,
                media_type,
                output_dir,
                download: !no_download,
            };
            let mut wizard = Wizard::new(&config)?;

            match wizard.run(&options).await? {
                WizardOutcome::Completed { video_url, file_name, saved_to } => {
                    println!("\nYour dubbed video is ready: {}", file_name);
                    println!("Link: {}", video_url);
                    if let Some(path) = saved_to {
                        println!("Saved to: {}", path.display());
                    }
                }
                WizardOutcome::Failed { status, message } => {
                    println!("\n{}", status);
                    anyhow::bail!("Processing failed: {}", message);
                }
                WizardOutcome::Cancelled => {
                    println!("\nCancelled. The backend may still finish; its result will be ignored.");
                }
            }
        }
        Commands::Languages => {
            println!("\nSupported Target Languages:");
            println!("{:<8} {:<30}", "Code", "Language");
            println!("{}", "-".repeat(38));
            for lang in SUPPORTED_LANGUAGES {
                println!("{:<8} {:<30}", lang.code, lang.name);
            }
        }
        Commands::Check => {
            let client = BackendClient::new(&config.api)?;
            let message = client.health().await?;
            println!("Backend at {} is up: {}", client.base_url(), message);
        }
        Commands::Config { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    info!("Dubflow finished");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".dubflow").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotated file, written off the main thread
    let file_appender = rolling::daily(&log_dir, "dubflow.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("dubflow.log").display());

    Ok(guard)
}
