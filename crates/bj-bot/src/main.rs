//! blackjack-bot: Blackjack Table Bot Main Binary
//!
//! Usage:
//!   blackjack-bot                    - Connect to Discord and host tables
//!   blackjack-bot --config <path>    - Use a specific TOML config file
//!   blackjack-bot --help             - Show help

use std::path::PathBuf;

use anyhow::{Context, bail};
use bj_core::Config;
use bj_discord::BlackjackBot;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Run the bot
    Bot { config_path: Option<PathBuf> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("blackjack-bot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Bot { config_path } => config_path,
    };

    // Load .env file first so RUST_LOG from it reaches the filter
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(config_path.as_deref()).context("Config error")?;

    tracing::info!("Starting blackjack-bot...");
    tracing::info!(
        "Thread name: {:?}, auto-archive {} min, text trigger {}",
        config.table.thread_name,
        config.table.auto_archive_minutes,
        if config.discord.text_trigger { "on" } else { "off" }
    );

    let bot = BlackjackBot::new(config);
    bot.start(shutdown_signal())
        .await
        .context("Discord bot error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let Some(path) = args.next() else {
                    bail!("--config requires a path");
                };
                config_path = Some(PathBuf::from(path));
            }
            other => bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Bot { config_path })
}

/// Print help message
fn print_help() {
    println!("blackjack-bot - Discord blackjack tables");
    println!();
    println!("Usage:");
    println!("  blackjack-bot                  Connect to Discord and host tables");
    println!("  blackjack-bot --config <path>  Read settings from a TOML file");
    println!("  blackjack-bot --help           Show this help message");
    println!("  blackjack-bot --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  DISCORD_BOT_TOKEN        Discord bot token (required, or DISCORD_SECRET)");
    println!("  DISCORD_GUILD_ID         Register /blackjack in this guild only");
    println!("  BLACKJACK_TEXT_TRIGGER   Also answer plain \"/blackjack\" messages (default: false)");
    println!("  BLACKJACK_MAX_RETRIES    Retries for failed Discord calls (default: 3)");
    println!("  BLACKJACK_RETRY_BASE_MS  First retry backoff in ms (default: 250)");
    println!("  RUST_LOG                 Log filter (default: info)");
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
