// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adrelay status` command implementation.
//!
//! Reads today's quota and queue sizes straight from the database, so it
//! works whether or not the bot is running.

use std::io::IsTerminal;
use std::path::Path;

use adrelay_config::model::AdrelayConfig;
use adrelay_core::{AdrelayError, ConfirmedStore, PendingStore, QuotaCounter, StorageAdapter};
use adrelay_storage::SqliteStorage;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub day: NaiveDate,
    pub quota_used: u32,
    pub quota_max: u32,
    pub pending: u64,
    pub published: u64,
}

/// Opens the configured database and reads the counters.
pub async fn collect_status(config: &AdrelayConfig) -> Result<StatusReport, AdrelayError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    let day = Utc::now().date_naive();
    let report = StatusReport {
        day,
        quota_used: storage.current_count(day).await?,
        quota_max: config.quota.daily_max,
        pending: storage.count_pending().await?,
        published: storage.count_confirmed().await?,
    };
    storage.close().await?;
    Ok(report)
}

/// Run the `adrelay status` command.
pub async fn run_status(config: &AdrelayConfig, json: bool, plain: bool) -> Result<(), AdrelayError> {
    let path = &config.storage.database_path;
    if !Path::new(path).exists() {
        if json {
            println!("{{\"database\":null}}");
        } else {
            println!("no database at {path}; start with: adrelay serve");
        }
        return Ok(());
    }

    let report = collect_status(config).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    println!();
    println!("  adrelay status ({} UTC)", report.day);
    println!("  {}", "-".repeat(35));

    let quota = format!("{}/{}", report.quota_used, report.quota_max);
    if use_color {
        use colored::Colorize;
        let quota = if report.quota_used >= report.quota_max {
            quota.red()
        } else {
            quota.green()
        };
        println!("    Quota:     {quota}");
    } else {
        println!("    Quota:     {quota}");
    }
    println!("    Pending:   {}", report.pending);
    println!("    Published: {}", report.published);
    println!();
}
