// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adrelay check` command implementation.

use adrelay_config::model::AdrelayConfig;

/// Prints the effective configuration with secrets masked.
pub fn run_check(config: &AdrelayConfig) {
    println!();
    println!("  adrelay check: configuration is valid");
    println!("  {}", "-".repeat(40));
    for (label, value) in summary(config) {
        println!("    {label:<18} {value}");
    }
    println!();
}

fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(s) if s.chars().count() > 4 => {
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            format!("****{tail}")
        }
        Some(_) => "****".to_string(),
        None => "(unset)".to_string(),
    }
}

fn summary(config: &AdrelayConfig) -> Vec<(&'static str, String)> {
    let telegram = &config.telegram;
    let payment = &config.payment;
    let schedule = &config.schedule;
    vec![
        ("bot token", mask(telegram.bot_token.as_deref())),
        ("bot username", telegram.bot_username.clone()),
        ("channel", telegram.channel.clone().unwrap_or_default()),
        (
            "channel url",
            telegram
                .resolved_channel_url()
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        (
            "admin chat",
            telegram
                .admin_chat_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ),
        (
            "payments",
            if payment.enabled {
                format!(
                    "enabled, {} minor units of currency {}",
                    payment.min_amount, payment.currency
                )
            } else {
                "disabled".to_string()
            },
        ),
        ("bank token", mask(config.bank.token.as_deref())),
        ("free path", payment.free_for_subscribers.to_string()),
        ("daily quota", config.quota.daily_max.to_string()),
        ("poll every", format!("{}s", schedule.poll_interval_secs)),
        ("expire after", format!("{}h", schedule.expiry_age_hours)),
        ("reap after", format!("{}s", schedule.stale_age_secs)),
        ("database", config.storage.database_path.clone()),
    ]
}
