mod alerts;
mod analyzer;
mod cli;
mod client;
mod commands;
mod config;
mod interfaces;
mod price;
mod refresh;
mod rules;
mod scoring;
mod severity;
mod state;
mod tui;

use clap::Parser;
use dotenv::dotenv;
use eyre::{Result, WrapErr};
use tracing::{info, Level};

use crate::cli::{Args, Command};
use crate::commands::Context;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // File logging keeps stdout for reports and the dashboard
    let file_appender = tracing_appender::rolling::daily("logs", "avax-insight.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = AppConfig::new(args.config.as_deref()).wrap_err("failed to load config")?;

    // Allow .env override for RPC_URL
    if let Ok(env_rpc) = std::env::var("RPC_URL") {
        if let Some(network) = config.active_network_mut() {
            network.rpc_url = env_rpc;
        }
    }

    info!("Configuration Loaded:");
    info!("  Network: {}", config.network);
    info!("  RPC URL: [HIDDEN]");
    info!("  Tracked tokens: {}", config.tokens.len());
    info!("  Webhook: {}", if config.alerts.webhook_url.is_empty() { "Disabled" } else { "Enabled" });

    let ctx = Context::new(config, args.format)?;

    match args.command {
        Command::Network => commands::network(&ctx).await,
        Command::Balance { address, history } => commands::balance(&ctx, &address, history).await,
        Command::Analyze { address, source, abi } => {
            commands::analyze(&ctx, &address, source.as_deref(), abi.as_deref()).await
        }
        Command::Scan { file } => commands::scan(&ctx, &file),
        Command::Functions { abi } => commands::functions(&ctx, &abi),
        Command::Simulate { address, abi, function, params, value } => {
            commands::simulate(&ctx, &address, &abi, &function, &params, value.as_deref()).await
        }
        Command::Score { stats, address } => commands::score(&ctx, stats, address.as_deref()).await,
        Command::Compare { first, second } => commands::compare(&ctx, &first, &second),
        Command::Wallet { action } => commands::wallet(&ctx, action).await,
        Command::Watch => commands::watch(&ctx).await,
    }
}
