//! # Candles — daily reminder service
//!
//! Stores one annually-recurring date per user per group and, once a day at
//! a fixed local time, posts a reminder to each group's configured channel.
//!
//! Usage:
//!   candles                        # Run with ~/.candles/config.toml
//!   candles --config ./dev.toml    # Custom config
//!   candles --db ./candles.sqlite  # Database override

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use candles_channels::DiscordChannel;
use candles_core::traits::SystemClock;
use candles_core::CandlesConfig;
use candles_scheduler::spawn_daily;
use candles_store::EventStore;

#[derive(Parser)]
#[command(
    name = "candles",
    version,
    about = "🎂 Candles — daily birthday reminders for chat groups"
)]
struct Cli {
    /// Path to the config file (default: ~/.candles/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path override
    #[arg(long)]
    db: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "candles=debug"
    } else {
        "candles=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => CandlesConfig::load_from(&expand_path(path))?,
        None => CandlesConfig::load()?,
    };
    let tz = config.tz()?;
    let trigger = config.trigger()?;

    if config.discord.bot_token.is_empty() {
        anyhow::bail!("No Discord bot token configured (set [discord].bot_token)");
    }

    let db_path = cli
        .db
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| expand_path(&config.database_path));
    let store = Arc::new(Mutex::new(
        EventStore::open(&db_path)
            .with_context(|| format!("opening database at {}", db_path.display()))?,
    ));
    tracing::info!("💾 Database ready at {}", db_path.display());

    let host = Arc::new(DiscordChannel::new(config.discord.clone()));
    let handle = spawn_daily(store, host, Arc::new(SystemClock), tz, trigger);
    tracing::info!("🎂 Candles running — reminders go out at {trigger} {tz}");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}
