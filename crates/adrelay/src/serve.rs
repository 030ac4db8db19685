// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `adrelay serve` command implementation.
//!
//! Opens storage, connects the Telegram adapter and the bank feed, starts
//! the supervised background tasks and runs the bot until a shutdown
//! signal arrives.

use std::sync::Arc;

use adrelay_config::model::AdrelayConfig;
use adrelay_core::error::AdrelayError;
use adrelay_core::{HealthStatus, PluginAdapter, StorageAdapter};
use adrelay_lifecycle::metrics::register_metrics;
use adrelay_lifecycle::shutdown::install_signal_handler;
use adrelay_lifecycle::{
    ExpiryCleaner, IntakeService, PaymentPoller, PublicationService, StaleReaper, Supervisor,
};
use adrelay_listing::OpenGraphParser;
use adrelay_payments::{CodeGenerator, MatchPolicy, MonobankClient};
use adrelay_storage::SqliteStorage;
use adrelay_telegram::{run_dispatcher, BotDeps, TelegramChannel};
use reqwest::Url;
use tracing::{info, warn};

/// Runs the `adrelay serve` command.
pub async fn run_serve(config: AdrelayConfig) -> Result<(), AdrelayError> {
    init_tracing(&config.app.log_level);
    register_metrics();

    info!("starting adrelay serve");

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };
    info!(path = %config.storage.database_path, "storage ready");

    let telegram = Arc::new(TelegramChannel::new(config.telegram.clone())?);
    match telegram.health_check().await? {
        HealthStatus::Healthy => info!("telegram bot reachable"),
        other => warn!(status = ?other, "telegram bot health check failed, continuing"),
    }

    let admin_chat_id = config
        .telegram
        .admin_chat_id
        .ok_or_else(|| AdrelayError::Config("telegram.admin_chat_id is required".into()))?;

    let publication = Arc::new(PublicationService::new(
        storage.clone(),
        telegram.clone(),
        config.quota.daily_max,
    ));
    let intake = Arc::new(IntakeService::new(
        storage.clone(),
        CodeGenerator::new(config.payment.code_length),
        config.telegram.placeholder_image_url.clone(),
        config.quota.daily_max,
    ));

    let cancel = install_signal_handler();
    let mut supervisor = Supervisor::new(cancel.clone());

    if config.payment.enabled {
        let bank = Arc::new(MonobankClient::new(&config.bank)?);
        let poller = Arc::new(PaymentPoller::new(
            storage.clone(),
            bank,
            publication.clone(),
            telegram.clone(),
            MatchPolicy {
                currency: config.payment.currency,
                min_amount: config.payment.min_amount,
            },
            config.bank.lookback(),
        ));
        supervisor.spawn(poller, config.schedule.poll_interval());
        info!(
            interval_secs = config.schedule.poll_interval_secs,
            min_amount = config.payment.min_amount,
            "payment poller enabled"
        );
    } else {
        info!("payments disabled, poller not started");
    }

    supervisor.spawn(
        Arc::new(ExpiryCleaner::new(
            storage.clone(),
            publication.clone(),
            config.schedule.expiry_age(),
        )),
        config.schedule.expiry_interval(),
    );
    supervisor.spawn(
        Arc::new(StaleReaper::new(storage.clone(), config.schedule.stale_age())),
        config.schedule.reaper_interval(),
    );
    info!(tasks = supervisor.len(), "background tasks started");

    let channel_url = config
        .telegram
        .resolved_channel_url()
        .and_then(|url| Url::parse(&url).ok());
    let deps = Arc::new(BotDeps {
        intake,
        publication,
        parser: Arc::new(OpenGraphParser::new()?),
        membership: telegram.clone(),
        payment: config.payment.clone(),
        admin_chat_id,
        bot_username: config.telegram.bot_username.clone(),
        channel_url,
    });

    run_dispatcher(telegram.bot().clone(), deps, cancel.clone()).await;

    // The dispatcher may also stop on its own; take the tasks down with it.
    cancel.cancel();
    supervisor.join_all().await;

    telegram.shutdown().await?;
    storage.close().await?;

    info!("adrelay serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("adrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
