// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: required secrets, positive
//! intervals, sane payment rules, and a usable channel reference.

use crate::diagnostic::ConfigError;
use crate::model::AdrelayConfig;

/// Allowed payment code lengths. Shorter codes risk accidental substring matches.
pub const CODE_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 6..=12;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AdrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if is_blank(config.telegram.bot_token.as_deref()) {
        errors.push(ConfigError::missing("telegram.bot_token"));
    }

    match config.telegram.channel.as_deref().map(str::trim) {
        None | Some("") => errors.push(ConfigError::missing("telegram.channel")),
        Some(channel) => {
            if !is_valid_channel(channel) {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "telegram.channel `{channel}` must be an @username or a numeric chat id"
                    ),
                });
            }
        }
    }

    if config.telegram.admin_chat_id.is_none() {
        errors.push(ConfigError::missing("telegram.admin_chat_id"));
    }

    if config.payment.enabled && is_blank(config.bank.token.as_deref()) {
        errors.push(ConfigError::missing("bank.token"));
    }

    if !(1..=999).contains(&config.payment.currency) {
        errors.push(ConfigError::Validation {
            message: format!(
                "payment.currency must be an ISO 4217 numeric code, got {}",
                config.payment.currency
            ),
        });
    }

    if config.payment.min_amount <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "payment.min_amount must be positive, got {}",
                config.payment.min_amount
            ),
        });
    }

    if !CODE_LENGTH_RANGE.contains(&config.payment.code_length) {
        errors.push(ConfigError::Validation {
            message: format!(
                "payment.code_length must be between {} and {}, got {}",
                CODE_LENGTH_RANGE.start(),
                CODE_LENGTH_RANGE.end(),
                config.payment.code_length
            ),
        });
    }

    if config.quota.daily_max == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.daily_max must be at least 1".to_string(),
        });
    }

    let positive = [
        ("schedule.poll_interval_secs", config.schedule.poll_interval_secs),
        ("schedule.expiry_interval_secs", config.schedule.expiry_interval_secs),
        ("schedule.expiry_age_hours", config.schedule.expiry_age_hours),
        ("schedule.reaper_interval_secs", config.schedule.reaper_interval_secs),
        ("schedule.stale_age_secs", config.schedule.stale_age_secs),
        ("bank.lookback_hours", config.bank.lookback_hours),
        ("bank.timeout_secs", config.bank.timeout_secs),
    ];
    for (key, value) in positive {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than zero"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn is_valid_channel(channel: &str) -> bool {
    if let Some(name) = channel.strip_prefix('@') {
        return !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    }
    channel.parse::<i64>().is_ok()
}
