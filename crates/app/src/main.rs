use anyhow::Context;
use clap::{Parser, Subcommand};
use slipscan_core::{Config, EngineBackend};
use slipscan_ocr::{EngineHandle, ReceiptPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "slipscan")]
#[command(about = "Receipt image quality checks, enhancement and OCR scoring")]
#[command(version)]
struct Cli {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `engine.backend` (mock, tesseract)
    #[arg(long, global = true)]
    backend: Option<EngineBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process image files and print one JSON document per file
    Scan {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Process images as they appear in the intake folder
    Watch {
        /// Overrides `intake.watch_dir`
        dir: Option<PathBuf>,
    },
    /// Print the health snapshot after an engine warm-up attempt
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(backend) = cli.backend {
        config.engine.backend = backend;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let engine_config = config.engine.clone();
    let engine = Arc::new(EngineHandle::new(move || commands::build_engine(&engine_config)));

    tracing::info!("Starting slipscan...");
    if config.warm_up || matches!(cli.command, Command::Health) {
        // Failure leaves the service degraded; the engine is retried per request.
        engine.warm_up().await;
    }

    let pipeline = ReceiptPipeline::new(Arc::clone(&engine));

    match cli.command {
        Command::Scan { files } => {
            let failures = commands::scan(&pipeline, &files).await;
            if failures > 0 {
                anyhow::bail!("{failures} of {} file(s) failed", files.len());
            }
        }
        Command::Watch { dir } => {
            let watch_dir = dir
                .or(config.intake.watch_dir.clone())
                .context("No intake folder: pass one or set intake.watch_dir")?;
            let output_dir = config.intake.output_dir.clone().unwrap_or_else(|| watch_dir.clone());
            std::fs::create_dir_all(&watch_dir)
                .with_context(|| format!("Failed to create {}", watch_dir.display()))?;

            // The channel bridges the notify watcher thread and the async processor.
            let (tx, rx) = mpsc::channel::<PathBuf>(64);
            let _watcher = commands::spawn_intake_watcher(&watch_dir, tx)
                .context("Failed to start intake folder watcher")?;
            tracing::info!("Watching intake folder: {}", watch_dir.display());

            commands::run_intake(&pipeline, rx, &output_dir).await;
        }
        Command::Health => {
            println!("{}", serde_json::to_string_pretty(&engine.health())?);
        }
    }

    Ok(())
}
