// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter and repository traits.
//!
//! Every repository operation is atomic on its own (a single statement or a
//! single transaction). No operation spans more than one call.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AdrelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChannelMessageId, ConfirmedRecord, Draft, NewConfirmation, OwnerId, PendingRequest, PostId,
    Publication, PublishedPost,
};

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection setup).
    async fn initialize(&self) -> Result<(), AdrelayError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), AdrelayError>;
}

/// Ad drafts keyed by post id.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn save_draft(&self, draft: &Draft) -> Result<(), AdrelayError>;

    async fn get_draft(&self, id: &PostId) -> Result<Option<Draft>, AdrelayError>;

    /// Sets the publication on a draft that has none yet.
    ///
    /// Returns `false` when the draft is missing or already published.
    async fn attach_publication(
        &self,
        id: &PostId,
        publication: Publication,
    ) -> Result<bool, AdrelayError>;

    /// Removes every unpublished draft of `owner`. Pending requests cascade.
    async fn delete_unpublished_drafts_for_owner(&self, owner: OwnerId)
        -> Result<u64, AdrelayError>;

    /// Removes unpublished drafts created before `cutoff` that no pending
    /// request or confirmed record still points at.
    async fn delete_unpublished_drafts_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, AdrelayError>;
}

/// Outstanding publication requests.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Inserts a request. Returns `false` when its code is already taken.
    async fn insert_pending(&self, request: &PendingRequest) -> Result<bool, AdrelayError>;

    /// All pending requests, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingRequest>, AdrelayError>;

    /// The most recently created request of `owner`.
    async fn latest_pending_for_owner(
        &self,
        owner: OwnerId,
    ) -> Result<Option<PendingRequest>, AdrelayError>;

    /// Records the transaction that paid for a request, so the request is
    /// published on a later cycle even once the transfer leaves the bank's
    /// lookback window. Returns `false` when the request no longer exists.
    async fn mark_pending_paid(&self, id: &str, transaction_id: &str) -> Result<bool, AdrelayError>;

    async fn delete_pending(&self, id: &str) -> Result<bool, AdrelayError>;

    /// Deletes unpaid requests created before `cutoff`. Paid requests stay.
    async fn delete_pending_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AdrelayError>;

    async fn count_pending(&self) -> Result<u64, AdrelayError>;
}

/// Records of published posts.
#[async_trait]
pub trait ConfirmedStore: Send + Sync {
    /// Atomically marks the draft published, inserts the confirmation, and
    /// removes the consumed pending request.
    async fn record_publication(&self, confirmation: &NewConfirmation)
        -> Result<(), AdrelayError>;

    /// Transaction ids referenced by any confirmed record.
    async fn used_transaction_ids(&self) -> Result<HashSet<String>, AdrelayError>;

    /// Confirmed records whose draft has no channel message yet.
    async fn list_unpublished_confirmed(&self) -> Result<Vec<ConfirmedRecord>, AdrelayError>;

    /// Published posts whose publication time is before `cutoff`.
    async fn list_published_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<PublishedPost>, AdrelayError>;

    async fn find_published_by_message(
        &self,
        message_id: ChannelMessageId,
    ) -> Result<Option<PublishedPost>, AdrelayError>;

    /// Removes the confirmation and every draft pointing at its post id or
    /// channel message. Returns the number of rows removed; zero means
    /// another caller already cleaned up.
    async fn remove_publication(&self, post: &PublishedPost) -> Result<u64, AdrelayError>;

    async fn count_confirmed(&self) -> Result<u64, AdrelayError>;
}

/// Per-day publication counter bounded by a daily maximum.
#[async_trait]
pub trait QuotaCounter: Send + Sync {
    /// Increments the day's count if it is below `max`.
    async fn try_claim(&self, day: NaiveDate, max: u32) -> Result<bool, AdrelayError>;

    /// Gives back one claim. Never drives the count below zero.
    async fn release(&self, day: NaiveDate) -> Result<bool, AdrelayError>;

    async fn current_count(&self, day: NaiveDate) -> Result<u32, AdrelayError>;
}

/// All four repositories behind one handle.
pub trait Store: DraftStore + PendingStore + ConfirmedStore + QuotaCounter {}

impl<T> Store for T where T: DraftStore + PendingStore + ConfirmedStore + QuotaCounter + ?Sized {}
