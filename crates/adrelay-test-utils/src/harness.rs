// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end lifecycle testing.
//!
//! `TestHarness` assembles every lifecycle service over a temp SQLite
//! database and mock collaborators, and offers seeding helpers for the
//! states the scenarios start from.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use adrelay_config::model::{AdrelayConfig, StorageConfig};
use adrelay_core::{
    AdrelayError, ChannelMessageId, ConfirmedRecord, ConfirmedStore, Draft, DraftStore, NewConfirmation,
    OwnerId, PendingRequest, PendingStore, PostId, Publication, PublishedPost, StorageAdapter,
    FREE_CODE,
};
use adrelay_lifecycle::{
    ExpiryCleaner, IntakeService, PaymentPoller, PublicationService, StaleReaper,
};
use adrelay_payments::{CodeGenerator, MatchPolicy};
use adrelay_storage::SqliteStorage;

use crate::fixtures::sample_ad;
use crate::mock_bank::MockBank;
use crate::mock_channel::{MockMembership, MockNotifier, MockPublisher};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: AdrelayConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: AdrelayConfig::default(),
        }
    }

    pub fn with_daily_max(mut self, daily_max: u32) -> Self {
        self.config.quota.daily_max = daily_max;
        self
    }

    pub fn with_min_amount(mut self, min_amount: i64) -> Self {
        self.config.payment.min_amount = min_amount;
        self
    }

    pub fn with_expiry_age_hours(mut self, hours: u64) -> Self {
        self.config.schedule.expiry_age_hours = hours;
        self
    }

    pub fn with_stale_age(mut self, age: Duration) -> Self {
        self.config.schedule.stale_age_secs = age.as_secs();
        self
    }

    /// Build the harness, creating the database and all services.
    pub async fn build(mut self) -> Result<TestHarness, AdrelayError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AdrelayError::Storage { source: e.into() })?;
        self.config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let store = SqliteStorage::new(self.config.storage.clone());
        store.initialize().await?;
        let store = Arc::new(store);

        let publisher = Arc::new(MockPublisher::new());
        let bank = Arc::new(MockBank::new());
        let notifier = Arc::new(MockNotifier::new());
        let membership = Arc::new(MockMembership::new());

        let config = &self.config;
        let publication = Arc::new(PublicationService::new(
            store.clone(),
            publisher.clone(),
            config.quota.daily_max,
        ));
        let intake = Arc::new(IntakeService::new(
            store.clone(),
            CodeGenerator::new(config.payment.code_length),
            config.telegram.placeholder_image_url.clone(),
            config.quota.daily_max,
        ));
        let poller = Arc::new(PaymentPoller::new(
            store.clone(),
            bank.clone(),
            publication.clone(),
            notifier.clone(),
            MatchPolicy {
                currency: config.payment.currency,
                min_amount: config.payment.min_amount,
            },
            config.bank.lookback(),
        ));
        let expiry = Arc::new(ExpiryCleaner::new(
            store.clone(),
            publication.clone(),
            config.schedule.expiry_age(),
        ));
        let reaper = Arc::new(StaleReaper::new(store.clone(), config.schedule.stale_age()));

        Ok(TestHarness {
            config: self.config,
            store,
            publisher,
            bank,
            notifier,
            membership,
            publication,
            intake,
            poller,
            expiry,
            reaper,
            next_message_id: AtomicI32::new(500),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete lifecycle stack over mock collaborators.
pub struct TestHarness {
    pub config: AdrelayConfig,
    pub store: Arc<SqliteStorage>,
    pub publisher: Arc<MockPublisher>,
    pub bank: Arc<MockBank>,
    pub notifier: Arc<MockNotifier>,
    pub membership: Arc<MockMembership>,
    pub publication: Arc<PublicationService>,
    pub intake: Arc<IntakeService>,
    pub poller: Arc<PaymentPoller>,
    pub expiry: Arc<ExpiryCleaner>,
    pub reaper: Arc<StaleReaper>,
    next_message_id: AtomicI32,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with the default configuration.
    pub async fn new() -> Result<Self, AdrelayError> {
        Self::builder().build().await
    }

    /// Save a draft and a pending request with a chosen code, both created at `created_at`.
    pub async fn seed_request(
        &self,
        owner: OwnerId,
        code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PendingRequest, AdrelayError> {
        let post_id = PostId(uuid::Uuid::new_v4().to_string());
        let draft = Draft::from_ad(post_id, owner, sample_ad(code), created_at);
        self.store.save_draft(&draft).await?;

        let request = PendingRequest {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            owner,
            post_id: draft.id,
            created_at,
            transaction_id: None,
        };
        if !self.store.insert_pending(&request).await? {
            return Err(AdrelayError::Internal(format!("code {code} already taken")));
        }
        Ok(request)
    }

    /// Store a post as published at `published_at`, without touching the mock channel.
    pub async fn seed_published(
        &self,
        owner: OwnerId,
        published_at: DateTime<Utc>,
    ) -> Result<PublishedPost, AdrelayError> {
        let post_id = PostId(uuid::Uuid::new_v4().to_string());
        let draft = Draft::from_ad(post_id.clone(), owner, sample_ad("published"), published_at);
        self.store.save_draft(&draft).await?;

        let record = ConfirmedRecord {
            id: uuid::Uuid::new_v4().to_string(),
            code: FREE_CODE.to_string(),
            owner,
            post_id,
            requested_at: published_at,
            transaction_id: None,
        };
        let publication = Publication {
            message_id: ChannelMessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)),
            published_at,
        };
        self.store
            .record_publication(&NewConfirmation {
                record: record.clone(),
                publication,
                consumed_pending: None,
            })
            .await?;
        Ok(PublishedPost {
            record,
            publication,
        })
    }
}
