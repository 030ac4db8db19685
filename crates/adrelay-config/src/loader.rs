// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./adrelay.toml` > `~/.config/adrelay/adrelay.toml` > `/etc/adrelay/adrelay.toml`
//! with environment variable overrides via the `ADRELAY_` prefix and a handful of
//! bare legacy names (`BOT_TOKEN`, `MONOBANK_TOKEN`, ...).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::model::AdrelayConfig;

/// Config sections that may appear as the first segment of an `ADRELAY_*` variable.
const SECTIONS: &[&str] = &[
    "app", "telegram", "bank", "payment", "quota", "schedule", "storage",
];

/// Bare environment names accepted for compatibility with older deployments.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("bot_token", "telegram.bot_token"),
    ("bot_username", "telegram.bot_username"),
    ("channel_username", "telegram.channel"),
    ("admin_chat_id", "telegram.admin_chat_id"),
    ("monobank_token", "bank.token"),
    ("mono_jar_url", "payment.jar_url"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/adrelay/adrelay.toml` (system-wide)
/// 3. `~/.config/adrelay/adrelay.toml` (user XDG config)
/// 4. `./adrelay.toml` (local directory)
/// 5. Legacy bare environment variables
/// 6. `ADRELAY_*` environment variables
pub fn load_config() -> Result<AdrelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AdrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AdrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AdrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// The TOML files consulted by [`build_figment`], lowest precedence first.
pub fn config_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/adrelay/adrelay.toml")];
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("adrelay/adrelay.toml"));
    }
    files.push(PathBuf::from("adrelay.toml"));
    files
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AdrelayConfig::default()));
    for file in config_files() {
        if file.exists() {
            debug!(path = %file.display(), "config file found");
        }
        figment = figment.merge(Toml::file(file));
    }
    figment.merge(legacy_env_provider()).merge(env_provider())
}

/// Maps a prefix-stripped env key to a dotted config key.
///
/// Figment hands keys over in their original case, so they are lowercased
/// first. Only the first underscore after a known section name becomes a
/// dot: `TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

/// Create the `ADRELAY_` environment variable provider.
///
/// Uses `Env::map()` NOT `Env::split("_")` because key names contain underscores.
fn env_provider() -> Env {
    Env::prefixed("ADRELAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Create the provider for bare legacy names like `BOT_TOKEN`.
fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let lowered = key.as_str().to_ascii_lowercase();
        LEGACY_ENV
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, target)| (*target).to_string())
            .unwrap_or(lowered)
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_file_takes_precedence_over_system_file() {
        let files = config_files();
        assert_eq!(files.first(), Some(&PathBuf::from("/etc/adrelay/adrelay.toml")));
        assert_eq!(files.last(), Some(&PathBuf::from("adrelay.toml")));
    }

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("schedule_poll_interval_secs"), "schedule.poll_interval_secs");
        assert_eq!(map_env_key("bank_token"), "bank.token");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
    }

    #[test]
    fn upper_case_env_keys_are_mapped() {
        assert_eq!(map_env_key("QUOTA_DAILY_MAX"), "quota.daily_max");
        assert_eq!(map_env_key("Telegram_Admin_Chat_Id"), "telegram.admin_chat_id");
    }

    #[test]
    fn prefixed_env_reaches_its_section() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ADRELAY_QUOTA_DAILY_MAX", "9");
            jail.set_env("ADRELAY_SCHEDULE_POLL_INTERVAL_SECS", "30");
            let config: AdrelayConfig = Figment::new()
                .merge(Serialized::defaults(AdrelayConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.quota.daily_max, 9);
            assert_eq!(config.schedule.poll_interval_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("mystery_key"), "mystery_key");
    }
}
