// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nestchat - conversation aggregation and engagement-policy service.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod migrate;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nestchat_config::NestchatConfig;

/// Nestchat - conversation aggregation and engagement-policy service.
#[derive(Parser, Debug)]
#[command(name = "nestchat", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of searching the standard config locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the REST gateway for every configured market.
    Serve,
    /// Validate the configuration and exit.
    CheckConfig,
    /// Apply pending schema migrations to every market database.
    Migrate,
}

fn load_config(path: Option<&PathBuf>) -> NestchatConfig {
    let loaded = match path {
        Some(path) => nestchat_config::load_and_validate_path(path),
        None => nestchat_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            nestchat_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::CheckConfig) => {
            println!(
                "nestchat: config OK ({} market(s), default `{}`, gateway {}:{})",
                config.markets.len(),
                config.service.default_market,
                config.gateway.host,
                config.gateway.port
            );
            Ok(())
        }
        Some(Commands::Migrate) => migrate::run_migrate(&config).await,
        None => {
            println!("nestchat: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
