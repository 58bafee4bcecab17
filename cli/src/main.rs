//! CLI entrypoint for kindergarten
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::Parser;
use kindergarten_application::ports::state_store::StateStore;
use kindergarten_application::{BotContext, PersistenceBridge, Reconciler, SystemClock};
use kindergarten_infrastructure::{
    ConfigLoader, DiscordGateway, FileConfig, FileLoggingConfig, JsonStateStore, Severity,
};
use kindergarten_presentation::{Cli, Command, ConsoleFormatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, &file_config.logging)?;

    let issues = file_config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Error => error!("Config: {}", issue),
            Severity::Warning => warn!("Config: {}", issue),
        }
    }
    if FileConfig::has_errors(&issues) {
        bail!("Invalid configuration ({} issue(s)), see log above", issues.len());
    }

    let state_file = cli
        .state_file
        .clone()
        .unwrap_or_else(|| file_config.storage.resolve_state_file());

    match cli.command {
        Command::Run => run(&file_config, state_file).await,
        Command::Status { json } => status(&state_file, json),
        Command::ShowConfig => {
            show_config(&cli, &file_config, &state_file);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8, logging: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level; RUST_LOG wins when set
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).with_context(|| {
                format!("Could not create log directory {}", directory.display())
            })?;
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run(config: &FileConfig, state_file: PathBuf) -> Result<()> {
    info!("Starting kindergarten");

    let token = config
        .discord
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("No Discord token. Set DISCORD_TOKEN or [discord] token."))?;

    // === Dependency Injection ===
    let gateway = DiscordGateway::connect(
        token,
        &config.discord.api_base,
        Duration::from_secs(config.discord.request_timeout_secs),
    )
    .await
    .context("Could not connect to Discord")?;

    info!(path = %state_file.display(), "Using state file");
    let ctx = BotContext::new(
        Arc::new(gateway),
        Arc::new(JsonStateStore::new(state_file)),
        Arc::new(SystemClock),
        config.to_bot_config(),
    );

    let persistence = PersistenceBridge::new(&ctx);
    persistence.restore_or_cold_start();

    let shutdown = CancellationToken::new();
    let handles = Arc::new(Reconciler::new(ctx.clone())).spawn(shutdown.clone());
    info!("Reconciliation loops running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    shutdown.cancel();
    handles.join().await;

    persistence
        .save()
        .context("Final state save failed")?;
    info!("State saved, bye");

    Ok(())
}

fn status(state_file: &Path, json: bool) -> Result<()> {
    let store = JsonStateStore::new(state_file);
    let snapshot = store
        .load()
        .with_context(|| format!("Could not read {}", state_file.display()))?
        .unwrap_or_default();

    let output = if json {
        ConsoleFormatter::format_state_json(&snapshot)
    } else {
        ConsoleFormatter::format_state(&snapshot, Utc::now())
    };
    println!("{}", output);
    Ok(())
}

fn show_config(cli: &Cli, config: &FileConfig, state_file: &Path) {
    println!("Configuration sources (in priority order):");
    if cli.no_config {
        println!("  (disabled by --no-config)");
    } else {
        for source in ConfigLoader::sources(cli.config.as_ref()) {
            println!(
                "{}",
                ConsoleFormatter::config_source(source.label, &source.location, source.found)
            );
        }
    }
    println!();
    println!("State file:    {}", state_file.display());
    println!(
        "Discord token: {}",
        if config.discord.token.is_some() { "set" } else { "missing" }
    );
    println!();
    print!("{}", ConsoleFormatter::format_bot_config(&config.to_bot_config()));
}
