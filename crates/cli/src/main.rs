mod args;
mod components;
mod metrics;
mod output;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubewalk_core::{
    load_config, load_config_from_env, validate_config, Config, RunRequest, SanitizedConfig,
    StopSignal,
};

use args::{Cli, Command, RunArgs};

/// Exit code for a run that ended in the aborted state.
const EXIT_ABORTED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let (plain, json) = if json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            ),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(io::stderr)),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(plain)
        .with(json)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run(args) => crawl(args).await,
        Command::CheckConfig { config } => {
            let config = load(config.as_deref())?;
            validate_config(&config).context("Configuration validation failed")?;
            let sanitized = SanitizedConfig::from(&config);
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
            Ok(0)
        }
    }
}

fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => {
            info!("No config file given, using defaults and environment");
            load_config_from_env().context("Failed to load config from environment")
        }
    }
}

async fn crawl(args: RunArgs) -> Result<i32> {
    let mut config = load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let seeds = args.collect_seeds()?;
    let pipeline = components::build_pipeline(&config)?;

    let stop = StopSignal::new();
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping crawl");
        stop_on_signal.stop();
    });

    let request = RunRequest::new(seeds)
        .with_criteria(config.filter)
        .with_topics(config.topics)
        .with_limits(config.crawl);
    let report = pipeline.run(request, stop).await;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            let mut writer = BufWriter::new(file);
            output::write_report(&report, args.format, &mut writer)?;
            writer.flush()?;
            info!("Wrote {} records to {:?}", report.records.len(), path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            output::write_report(&report, args.format, &mut writer)?;
            writer.flush()?;
        }
    }

    if let Some(path) = &args.metrics_out {
        std::fs::write(path, metrics::encode_metrics())
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
    }

    if report.is_aborted() {
        match &report.abort_reason {
            Some(reason) => warn!("Run {} aborted: {}", report.run_id, reason),
            None => warn!("Run {} aborted", report.run_id),
        }
        return Ok(EXIT_ABORTED);
    }
    info!(
        "Run {} finished: {} ranked, {} excluded, {} failed",
        report.run_id,
        report.records.len(),
        report.excluded.len(),
        report.failures.len()
    );
    Ok(0)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
