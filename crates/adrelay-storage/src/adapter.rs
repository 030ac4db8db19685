// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and repository traits.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use adrelay_config::model::StorageConfig;
use adrelay_core::types::{
    ChannelMessageId, ConfirmedRecord, Draft, NewConfirmation, OwnerId, PendingRequest, PostId,
    Publication, PublishedPost,
};
use adrelay_core::{
    AdapterType, AdrelayError, ConfirmedStore, DraftStore, HealthStatus, PendingStore,
    PluginAdapter, QuotaCounter, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, AdrelayError> {
        self.db()
    }

    fn db(&self) -> Result<&Database, AdrelayError> {
        self.db.get().ok_or_else(|| AdrelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AdrelayError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AdrelayError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), AdrelayError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;
        self.db.set(db).map_err(|_| AdrelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AdrelayError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl DraftStore for SqliteStorage {
    async fn save_draft(&self, draft: &Draft) -> Result<(), AdrelayError> {
        queries::drafts::save_draft(self.db()?, draft).await
    }

    async fn get_draft(&self, id: &PostId) -> Result<Option<Draft>, AdrelayError> {
        queries::drafts::get_draft(self.db()?, id).await
    }

    async fn attach_publication(
        &self,
        id: &PostId,
        publication: Publication,
    ) -> Result<bool, AdrelayError> {
        queries::drafts::attach_publication(self.db()?, id, publication).await
    }

    async fn delete_unpublished_drafts_for_owner(
        &self,
        owner: OwnerId,
    ) -> Result<u64, AdrelayError> {
        queries::drafts::delete_unpublished_for_owner(self.db()?, owner).await
    }

    async fn delete_unpublished_drafts_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AdrelayError> {
        queries::drafts::delete_unpublished_before(self.db()?, cutoff).await
    }
}

#[async_trait]
impl PendingStore for SqliteStorage {
    async fn insert_pending(&self, request: &PendingRequest) -> Result<bool, AdrelayError> {
        queries::pending::insert(self.db()?, request).await
    }

    async fn list_pending(&self) -> Result<Vec<PendingRequest>, AdrelayError> {
        queries::pending::list(self.db()?).await
    }

    async fn latest_pending_for_owner(
        &self,
        owner: OwnerId,
    ) -> Result<Option<PendingRequest>, AdrelayError> {
        queries::pending::latest_for_owner(self.db()?, owner).await
    }

    async fn mark_pending_paid(&self, id: &str, transaction_id: &str) -> Result<bool, AdrelayError> {
        queries::pending::mark_paid(self.db()?, id, transaction_id).await
    }

    async fn delete_pending(&self, id: &str) -> Result<bool, AdrelayError> {
        queries::pending::delete(self.db()?, id).await
    }

    async fn delete_pending_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AdrelayError> {
        queries::pending::delete_before(self.db()?, cutoff).await
    }

    async fn count_pending(&self) -> Result<u64, AdrelayError> {
        queries::pending::count(self.db()?).await
    }
}

#[async_trait]
impl ConfirmedStore for SqliteStorage {
    async fn record_publication(
        &self,
        confirmation: &NewConfirmation,
    ) -> Result<(), AdrelayError> {
        queries::confirmed::record_publication(self.db()?, confirmation).await
    }

    async fn used_transaction_ids(&self) -> Result<HashSet<String>, AdrelayError> {
        queries::confirmed::used_transaction_ids(self.db()?).await
    }

    async fn list_unpublished_confirmed(&self) -> Result<Vec<ConfirmedRecord>, AdrelayError> {
        queries::confirmed::list_unpublished(self.db()?).await
    }

    async fn list_published_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PublishedPost>, AdrelayError> {
        queries::confirmed::list_published_before(self.db()?, cutoff).await
    }

    async fn find_published_by_message(
        &self,
        message_id: ChannelMessageId,
    ) -> Result<Option<PublishedPost>, AdrelayError> {
        queries::confirmed::find_published_by_message(self.db()?, message_id).await
    }

    async fn remove_publication(&self, post: &PublishedPost) -> Result<u64, AdrelayError> {
        queries::confirmed::remove_publication(self.db()?, post).await
    }

    async fn count_confirmed(&self) -> Result<u64, AdrelayError> {
        queries::confirmed::count(self.db()?).await
    }
}

#[async_trait]
impl QuotaCounter for SqliteStorage {
    async fn try_claim(&self, day: NaiveDate, max: u32) -> Result<bool, AdrelayError> {
        queries::quota::try_claim(self.db()?, day, max).await
    }

    async fn release(&self, day: NaiveDate) -> Result<bool, AdrelayError> {
        queries::quota::release(self.db()?, day).await
    }

    async fn current_count(&self, day: NaiveDate) -> Result<u32, AdrelayError> {
        queries::quota::current_count(self.db()?, day).await
    }
}
