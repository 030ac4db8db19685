// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the adrelay configuration system.

use adrelay_config::diagnostic::ConfigError;
use adrelay_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

const COMPLETE: &str = r#"
[app]
log_level = "debug"

[telegram]
bot_token = "123456:ABC"
channel = "@market_ua"
admin_chat_id = 777

[bank]
token = "mono-token"
lookback_hours = 24

[payment]
min_amount = 2000
jar_url = "https://send.monobank.ua/jar/abc"

[quota]
daily_max = 50

[schedule]
poll_interval_secs = 60

[storage]
database_path = "/tmp/adrelay-test.db"
wal_mode = false
"#;

#[test]
fn complete_toml_deserializes() {
    let config = load_config_from_str(COMPLETE).expect("valid TOML should deserialize");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123456:ABC"));
    assert_eq!(config.telegram.channel.as_deref(), Some("@market_ua"));
    assert_eq!(config.telegram.admin_chat_id, Some(777));
    assert_eq!(config.bank.token.as_deref(), Some("mono-token"));
    assert_eq!(config.bank.lookback_hours, 24);
    assert_eq!(config.payment.min_amount, 2000);
    assert_eq!(config.quota.daily_max, 50);
    assert_eq!(config.schedule.poll_interval_secs, 60);
    assert_eq!(config.storage.database_path, "/tmp/adrelay-test.db");
    assert!(!config.storage.wal_mode);
}

#[test]
fn complete_toml_validates() {
    let config = load_and_validate_str(COMPLETE).expect("complete config should validate");
    assert_eq!(config.quota.daily_max, 50);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.app.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert_eq!(config.bank.base_url, "https://api.monobank.ua");
    assert_eq!(config.bank.lookback_hours, 48);
    assert!(config.payment.enabled);
    assert_eq!(config.payment.currency, 980);
    assert_eq!(config.payment.min_amount, 1500);
    assert_eq!(config.payment.code_length, 6);
    assert_eq!(config.quota.daily_max, 100);
    assert_eq!(config.schedule.poll_interval_secs, 120);
    assert_eq!(config.schedule.expiry_interval_secs, 3 * 3600);
    assert_eq!(config.schedule.expiry_age_hours, 45);
    assert_eq!(config.schedule.reaper_interval_secs, 1800);
    assert_eq!(config.schedule.stale_age_secs, 3600);
    assert!(config.storage.wal_mode);
}

#[test]
fn unknown_field_in_quota_is_rejected() {
    let toml = r#"
[quota]
daly_max = 5
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("daly_max"),
        "error should mention unknown field, got: {err_str}"
    );
}

#[test]
fn unknown_field_diagnostic_suggests_closest_key() {
    let toml = r#"
[payment]
min_ammount = 5
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("min_amount"));
}

#[test]
fn non_numeric_admin_chat_id_is_invalid_type() {
    let toml = r#"
[telegram]
admin_chat_id = "abc"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject string chat id");
    assert!(
        errors.iter().any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType, got: {errors:?}"
    );
}

#[test]
fn missing_required_values_are_all_reported() {
    let errors = load_and_validate_str("").expect_err("defaults lack required keys");
    let missing: Vec<String> = errors
        .iter()
        .filter_map(|e| match e {
            ConfigError::MissingKey { key, .. } => Some(key.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        missing,
        vec![
            "telegram.bot_token",
            "telegram.channel",
            "telegram.admin_chat_id",
            "bank.token",
        ]
    );
}

#[test]
fn prefixed_env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("adrelay.toml", COMPLETE)?;
        jail.set_env("ADRELAY_QUOTA_DAILY_MAX", "7");
        jail.set_env("ADRELAY_TELEGRAM_BOT_USERNAME", "@other_bot");

        let config = load_and_validate_path(std::path::Path::new("adrelay.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.quota.daily_max, 7);
        assert_eq!(config.telegram.bot_username, "@other_bot");
        Ok(())
    });
}

#[test]
fn legacy_env_names_are_honored() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("adrelay.toml", "[storage]\ndatabase_path = \"x.db\"\n")?;
        jail.set_env("BOT_TOKEN", "999:legacy");
        jail.set_env("CHANNEL_USERNAME", "@legacy_channel");
        jail.set_env("ADMIN_CHAT_ID", "123");
        jail.set_env("MONOBANK_TOKEN", "legacy-mono");
        jail.set_env("MONO_JAR_URL", "https://send.monobank.ua/jar/legacy");

        let config = load_and_validate_path(std::path::Path::new("adrelay.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("999:legacy"));
        assert_eq!(config.telegram.channel.as_deref(), Some("@legacy_channel"));
        assert_eq!(config.telegram.admin_chat_id, Some(123));
        assert_eq!(config.bank.token.as_deref(), Some("legacy-mono"));
        assert_eq!(
            config.payment.jar_url.as_deref(),
            Some("https://send.monobank.ua/jar/legacy")
        );
        Ok(())
    });
}

#[test]
fn prefixed_env_wins_over_legacy_name() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("adrelay.toml", COMPLETE)?;
        jail.set_env("BOT_TOKEN", "legacy");
        jail.set_env("ADRELAY_TELEGRAM_BOT_TOKEN", "prefixed");

        let config = load_and_validate_path(std::path::Path::new("adrelay.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("prefixed"));
        Ok(())
    });
}
