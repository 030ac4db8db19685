// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! adrelay - reposts marketplace listings to a Telegram channel.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// adrelay - reposts marketplace listings to a Telegram channel.
#[derive(Parser, Debug)]
#[command(name = "adrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot and its background tasks (default).
    Serve,
    /// Validate configuration and print a summary.
    Check,
    /// Show today's quota and queue sizes from the database.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => adrelay_config::load_and_validate_path(path),
        None => adrelay_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            adrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        None | Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Check) => {
            check::run_check(&config);
            Ok(())
        }
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
