// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for adrelay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level adrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// Every section has defaults, but a few values (bot token, channel, admin chat,
/// bank token) have none and are enforced by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdrelayConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Telegram bot and target channel.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Bank statement feed.
    #[serde(default)]
    pub bank: BankConfig,

    /// Payment matching rules.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Daily publication cap.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Background task intervals and age thresholds.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot and target channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Bot username shown in captions.
    #[serde(default = "default_bot_username")]
    pub bot_username: String,

    /// Target channel: `@username` or a numeric chat id. Required.
    #[serde(default)]
    pub channel: Option<String>,

    /// Public link to the channel. Derived from `channel` when unset.
    #[serde(default)]
    pub channel_url: Option<String>,

    /// Chat id with elevated rights (delete any post, skip subscription check). Required.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,

    /// Image used when a listing has none.
    #[serde(default = "default_placeholder_image_url")]
    pub placeholder_image_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_username: default_bot_username(),
            channel: None,
            channel_url: None,
            admin_chat_id: None,
            placeholder_image_url: default_placeholder_image_url(),
        }
    }
}

impl TelegramConfig {
    /// Link users can open to reach the channel, if one can be determined.
    pub fn resolved_channel_url(&self) -> Option<String> {
        if let Some(url) = &self.channel_url {
            return Some(url.clone());
        }
        self.channel
            .as_deref()
            .and_then(|c| c.strip_prefix('@'))
            .map(|name| format!("https://t.me/{name}"))
    }
}

fn default_bot_username() -> String {
    "@adrelay_bot".to_string()
}

fn default_placeholder_image_url() -> String {
    "https://via.placeholder.com/300".to_string()
}

/// Bank statement feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BankConfig {
    /// Personal API token. Required when payments are enabled.
    #[serde(default)]
    pub token: Option<String>,

    /// Base URL of the statement API.
    #[serde(default = "default_bank_base_url")]
    pub base_url: String,

    /// Account selector in the statement path (`0` is the default account).
    #[serde(default = "default_bank_account")]
    pub account: String,

    /// How far back each poll looks for transactions.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,

    /// HTTP request timeout.
    #[serde(default = "default_bank_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient HTTP statuses within one poll.
    #[serde(default = "default_bank_max_retries")]
    pub max_retries: u32,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_bank_base_url(),
            account: default_bank_account(),
            lookback_hours: default_lookback_hours(),
            timeout_secs: default_bank_timeout_secs(),
            max_retries: default_bank_max_retries(),
        }
    }
}

impl BankConfig {
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_hours * 3600)
    }
}

fn default_bank_base_url() -> String {
    "https://api.monobank.ua".to_string()
}

fn default_bank_account() -> String {
    "0".to_string()
}

fn default_lookback_hours() -> u64 {
    48
}

fn default_bank_timeout_secs() -> u64 {
    30
}

fn default_bank_max_retries() -> u32 {
    1
}

/// Payment matching rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Enables the paid path and the payment poller.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Settlement currency, ISO 4217 numeric (980 = UAH).
    #[serde(default = "default_currency")]
    pub currency: u16,

    /// Minimum accepted amount in minor units.
    #[serde(default = "default_min_amount")]
    pub min_amount: i64,

    /// Donation-jar link shown next to the payment code.
    #[serde(default)]
    pub jar_url: Option<String>,

    /// Length of generated payment codes.
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Lets channel subscribers publish without paying.
    #[serde(default = "default_true")]
    pub free_for_subscribers: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            currency: default_currency(),
            min_amount: default_min_amount(),
            jar_url: None,
            code_length: default_code_length(),
            free_for_subscribers: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_currency() -> u16 {
    980
}

fn default_min_amount() -> i64 {
    1500
}

fn default_code_length() -> usize {
    6
}

/// Daily publication cap.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Maximum publications per UTC day.
    #[serde(default = "default_daily_max")]
    pub daily_max: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_max: default_daily_max(),
        }
    }
}

fn default_daily_max() -> u32 {
    100
}

/// Background task intervals and age thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Payment poller period.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Expiry cleaner period.
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,

    /// Age after which a published post is removed from the channel.
    #[serde(default = "default_expiry_age_hours")]
    pub expiry_age_hours: u64,

    /// Stale-pending reaper period.
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,

    /// Age after which unpaid requests and unpublished drafts are discarded.
    #[serde(default = "default_stale_age_secs")]
    pub stale_age_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            expiry_interval_secs: default_expiry_interval_secs(),
            expiry_age_hours: default_expiry_age_hours(),
            reaper_interval_secs: default_reaper_interval_secs(),
            stale_age_secs: default_stale_age_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval_secs)
    }

    pub fn expiry_age(&self) -> Duration {
        Duration::from_secs(self.expiry_age_hours * 3600)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn stale_age(&self) -> Duration {
        Duration::from_secs(self.stale_age_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_expiry_interval_secs() -> u64 {
    3 * 3600
}

fn default_expiry_age_hours() -> u64 {
    45
}

fn default_reaper_interval_secs() -> u64 {
    30 * 60
}

fn default_stale_age_secs() -> u64 {
    3600
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("adrelay").join("adrelay.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("adrelay.db"))
        .to_string_lossy()
        .into_owned()
}
