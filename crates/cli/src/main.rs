//! quire command-line reader.
//!
//! Logs go to stderr so `quire read` output can be piped.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use quire_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AppConfig::load()?;
    let token = args.token.or_else(|| config.lms_token.clone());
    let reader = Arc::new(commands::build_reader(&config, token).await?);

    commands::run(&reader, &config, args.command).await
}
