// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single path by which drafts reach the channel and leave it again.
//!
//! The poller, the free path and the recovery step all publish through
//! [`PublicationService`], so the ordering below holds for every caller:
//!
//! 1. If the draft already carries a channel message id, only the
//!    bookkeeping is finished. Nothing is sent twice.
//! 2. One unit of today's quota is claimed.
//! 3. The publisher sends the draft.
//! 4. The message id, the confirmation and the removal of the pending
//!    request are written in one store transaction.
//!
//! A failed publish releases its quota claim. A crash between steps 3 and 4
//! can still produce one duplicate post on the next attempt; the channel
//! offers no idempotency key to close that window.
//!
//! Removal runs the other way round: the channel message is deleted first
//! and rows are removed only once the channel confirms it is gone.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use adrelay_core::{
    AdrelayError, ChannelMessageId, ConfirmedRecord, DeleteOutcome, NewConfirmation, OwnerId,
    PendingRequest, PostId, Publication, PublishedPost, Publisher, Store, FREE_CODE,
};

use crate::metrics;

/// Result of one attempt to publish a draft.
#[derive(Debug)]
pub enum PublishOutcome {
    /// The post is now in the channel.
    Published(ChannelMessageId),
    /// The draft was already in the channel; only the records were completed.
    AlreadyPublished(ChannelMessageId),
    /// Today's quota is used up. Nothing changed.
    QuotaExhausted,
    /// Another task is publishing the same draft right now.
    InFlight,
    /// There is no draft (or no request) to publish.
    NothingToPublish,
    /// The channel did not accept the post. The quota claim was released.
    PublishFailed(AdrelayError),
    /// The draft was removed while its post was going out. The post was
    /// taken down again and the quota claim released.
    Withdrawn,
}

impl PublishOutcome {
    /// The channel message id, when the draft is in the channel.
    pub fn message_id(&self) -> Option<ChannelMessageId> {
        match self {
            Self::Published(id) | Self::AlreadyPublished(id) => Some(*id),
            _ => None,
        }
    }
}

/// Result of removing a published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The channel message is gone and its rows were removed.
    Removed,
    /// The channel message is gone; another caller had already removed the rows.
    AlreadyCleaned,
    /// The channel refused or failed. Rows are kept for a later attempt.
    Kept(DeleteOutcome),
    /// No published post uses this message id.
    NotFound,
    /// The requester neither owns the post nor is an admin.
    NotOwner,
    /// An admin removed a channel message the database never tracked.
    Untracked(DeleteOutcome),
}

/// Tally of one recovery pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Confirmations that now have a channel message.
    pub published: usize,
    /// Confirmations left for a later cycle (quota, channel error).
    pub deferred: usize,
}

/// Publishes and retracts drafts, keeping the channel and the store in step.
pub struct PublicationService {
    store: Arc<dyn Store>,
    publisher: Arc<dyn Publisher>,
    daily_max: u32,
    in_flight: Mutex<HashSet<PostId>>,
}

/// Holds a draft's slot in the in-flight set until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<PostId>>,
    post_id: PostId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.post_id);
    }
}

impl PublicationService {
    pub fn new(store: Arc<dyn Store>, publisher: Arc<dyn Publisher>, daily_max: u32) -> Self {
        Self {
            store,
            publisher,
            daily_max,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn daily_max(&self) -> u32 {
        self.daily_max
    }

    /// Publish the draft behind a paid request and consume the request.
    pub async fn publish_request(
        &self,
        request: &PendingRequest,
        transaction_id: &str,
    ) -> Result<PublishOutcome, AdrelayError> {
        let record = ConfirmedRecord {
            id: uuid::Uuid::new_v4().to_string(),
            code: request.code.clone(),
            owner: request.owner,
            post_id: request.post_id.clone(),
            requested_at: request.created_at,
            transaction_id: Some(transaction_id.to_string()),
        };
        self.publish(record, Some(request.id.clone()), "paid").await
    }

    /// Publish the owner's most recent request without payment.
    ///
    /// The caller decides who may use the free path.
    pub async fn publish_free(&self, owner: OwnerId) -> Result<PublishOutcome, AdrelayError> {
        let Some(request) = self.store.latest_pending_for_owner(owner).await? else {
            return Ok(PublishOutcome::NothingToPublish);
        };
        let record = ConfirmedRecord {
            id: uuid::Uuid::new_v4().to_string(),
            code: FREE_CODE.to_string(),
            owner,
            post_id: request.post_id.clone(),
            requested_at: Utc::now(),
            transaction_id: None,
        };
        self.publish(record, Some(request.id), "free").await
    }

    /// Publish confirmations whose draft never reached the channel.
    ///
    /// Confirmations are normally written together with the message id, so
    /// this only finds rows left by older deployments or manual edits.
    pub async fn recover_unpublished(&self) -> Result<RecoveryReport, AdrelayError> {
        let mut report = RecoveryReport::default();
        for record in self.store.list_unpublished_confirmed().await? {
            let post_id = record.post_id.clone();
            match self.publish(record, None, "recovered").await {
                Ok(outcome) if outcome.message_id().is_some() => report.published += 1,
                Ok(outcome) => {
                    debug!(post_id = %post_id, ?outcome, "recovery deferred");
                    report.deferred += 1;
                }
                Err(e) => {
                    warn!(post_id = %post_id, error = %e, "recovery failed (non-fatal)");
                    report.deferred += 1;
                }
            }
        }
        Ok(report)
    }

    /// Delete a published post from the channel, then drop its rows.
    ///
    /// Rows survive unless the channel reports the message deleted or
    /// already missing.
    pub async fn retract(&self, post: &PublishedPost) -> Result<DeletionOutcome, AdrelayError> {
        let message_id = post.publication.message_id;
        let outcome = self.publisher.delete(message_id).await;
        if !outcome.is_gone() {
            warn!(
                message_id = %message_id,
                post_id = %post.record.post_id,
                ?outcome,
                "channel kept the post; rows left in place"
            );
            return Ok(DeletionOutcome::Kept(outcome));
        }

        let removed = self.store.remove_publication(post).await?;
        if removed == 0 {
            debug!(message_id = %message_id, "post already cleaned up");
            return Ok(DeletionOutcome::AlreadyCleaned);
        }
        info!(
            message_id = %message_id,
            post_id = %post.record.post_id,
            rows = removed,
            "post removed"
        );
        Ok(DeletionOutcome::Removed)
    }

    /// Delete a post on behalf of a user.
    ///
    /// Owners may delete their own posts. Admins may delete any post,
    /// including channel messages the database does not know about.
    pub async fn delete_post(
        &self,
        requester: OwnerId,
        is_admin: bool,
        message_id: ChannelMessageId,
    ) -> Result<DeletionOutcome, AdrelayError> {
        let Some(post) = self.store.find_published_by_message(message_id).await? else {
            if !is_admin {
                return Ok(DeletionOutcome::NotFound);
            }
            let outcome = self.publisher.delete(message_id).await;
            info!(message_id = %message_id, ?outcome, "admin removed an untracked message");
            return Ok(DeletionOutcome::Untracked(outcome));
        };

        if !is_admin && post.record.owner != requester {
            warn!(
                owner_id = %requester,
                message_id = %message_id,
                "delete refused: not the owner"
            );
            return Ok(DeletionOutcome::NotOwner);
        }
        self.retract(&post).await
    }

    async fn publish(
        &self,
        record: ConfirmedRecord,
        consumed_pending: Option<String>,
        path: &'static str,
    ) -> Result<PublishOutcome, AdrelayError> {
        let Some(_slot) = self.enter(&record.post_id) else {
            debug!(post_id = %record.post_id, "publish already in flight");
            return Ok(PublishOutcome::InFlight);
        };

        let Some(draft) = self.store.get_draft(&record.post_id).await? else {
            return Ok(PublishOutcome::NothingToPublish);
        };

        if let Some(publication) = draft.publication {
            let message_id = publication.message_id;
            self.store
                .record_publication(&NewConfirmation {
                    record,
                    publication,
                    consumed_pending,
                })
                .await?;
            debug!(post_id = %draft.id, message_id = %message_id, "draft already published");
            return Ok(PublishOutcome::AlreadyPublished(message_id));
        }

        let day = Utc::now().date_naive();
        let claimed = self.store.try_claim(day, self.daily_max).await?;
        metrics::record_quota_claim(claimed);
        if !claimed {
            info!(post_id = %draft.id, daily_max = self.daily_max, "daily quota exhausted");
            return Ok(PublishOutcome::QuotaExhausted);
        }

        let message_id = match self.publisher.publish(&draft).await {
            Ok(id) => id,
            Err(e) => {
                metrics::record_publish_failure();
                self.release_claim(day).await;
                if e.is_permanent() {
                    error!(post_id = %draft.id, error = %e, "channel refused the post");
                } else {
                    warn!(post_id = %draft.id, error = %e, "publish failed, will retry");
                }
                return Ok(PublishOutcome::PublishFailed(e));
            }
        };

        let publication = Publication {
            message_id,
            published_at: Utc::now(),
        };
        let confirmation = NewConfirmation {
            record,
            publication,
            consumed_pending,
        };
        if let Err(e) = self.store.record_publication(&confirmation).await {
            return self.recover_unrecorded(&draft.id, publication, day, e).await;
        }

        metrics::record_publication(path);
        self.report_quota(day).await;
        info!(
            post_id = %draft.id,
            owner_id = %draft.owner,
            message_id = %message_id,
            code = %confirmation.record.code,
            path,
            "post published"
        );
        Ok(PublishOutcome::Published(message_id))
    }

    /// Handles a live post whose confirmation could not be written.
    ///
    /// If the draft is still there, the message id is pinned on it so the
    /// next attempt finalizes instead of reposting. If the draft is gone
    /// (reaped or cancelled mid-publish), nothing could ever expire the
    /// post, so it is deleted from the channel and the claim released.
    async fn recover_unrecorded(
        &self,
        post_id: &PostId,
        publication: Publication,
        day: NaiveDate,
        cause: AdrelayError,
    ) -> Result<PublishOutcome, AdrelayError> {
        let message_id = publication.message_id;
        match self.store.get_draft(post_id).await {
            Ok(Some(_)) => {
                error!(
                    post_id = %post_id,
                    message_id = %message_id,
                    error = %cause,
                    "post is live but its confirmation was not saved"
                );
                if let Err(attach_err) = self.store.attach_publication(post_id, publication).await {
                    error!(post_id = %post_id, error = %attach_err, "could not pin message id");
                }
                Err(cause)
            }
            Ok(None) => {
                let outcome = self.publisher.delete(message_id).await;
                if outcome.is_gone() {
                    warn!(
                        post_id = %post_id,
                        message_id = %message_id,
                        "draft vanished while publishing; post withdrawn"
                    );
                } else {
                    error!(
                        post_id = %post_id,
                        message_id = %message_id,
                        ?outcome,
                        "draft vanished while publishing and the post could not be withdrawn"
                    );
                }
                metrics::record_publish_failure();
                self.release_claim(day).await;
                Ok(PublishOutcome::Withdrawn)
            }
            Err(lookup_err) => {
                error!(
                    post_id = %post_id,
                    message_id = %message_id,
                    error = %lookup_err,
                    "post is live but its confirmation was not saved"
                );
                Err(cause)
            }
        }
    }

    fn enter(&self, post_id: &PostId) -> Option<InFlight<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert(post_id.clone()) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            post_id: post_id.clone(),
        })
    }

    async fn release_claim(&self, day: NaiveDate) {
        if let Err(e) = self.store.release(day).await {
            warn!(%day, error = %e, "quota release failed (non-fatal)");
        }
    }

    async fn report_quota(&self, day: NaiveDate) {
        match self.store.current_count(day).await {
            Ok(count) => metrics::set_quota_used(count),
            Err(e) => debug!(error = %e, "quota gauge not updated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrelay_config::model::StorageConfig;
    use adrelay_core::{AdData, ConfirmedStore, Draft, DraftStore, PendingStore, QuotaCounter, StorageAdapter};
    use adrelay_storage::SqliteStorage;
    use adrelay_test_utils::MockPublisher;
    use chrono::{DateTime, Duration};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<SqliteStorage>,
        publisher: Arc<MockPublisher>,
        service: PublicationService,
    }

    async fn fixture(daily_max: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();
        let store = Arc::new(store);
        let publisher = Arc::new(MockPublisher::new());
        let service = PublicationService::new(store.clone(), publisher.clone(), daily_max);
        Fixture {
            _dir: dir,
            store,
            publisher,
            service,
        }
    }

    async fn open_request(store: &SqliteStorage, id: &str, owner: i64, code: &str) -> PendingRequest {
        let ad = AdData {
            title: format!("Item {id}"),
            price: "500 грн".into(),
            description: "Good condition".into(),
            image_url: Some("https://example.com/i.jpg".into()),
            source_url: "https://www.olx.ua/d/obyavlenie/item".into(),
        };
        let draft = Draft::from_ad(PostId(id.into()), OwnerId(owner), ad, Utc::now());
        store.save_draft(&draft).await.unwrap();
        let request = PendingRequest {
            id: format!("req-{id}"),
            code: code.into(),
            owner: OwnerId(owner),
            post_id: draft.id.clone(),
            created_at: Utc::now(),
            transaction_id: None,
        };
        assert!(store.insert_pending(&request).await.unwrap());
        request
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn paid_request_is_published_and_consumed() {
        let f = fixture(10).await;
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;

        let outcome = f.service.publish_request(&request, "tx-1").await.unwrap();
        let message_id = outcome.message_id().expect("published");

        let draft = f.store.get_draft(&request.post_id).await.unwrap().unwrap();
        assert_eq!(draft.publication.map(|p| p.message_id), Some(message_id));
        assert_eq!(f.store.count_pending().await.unwrap(), 0);
        assert!(f.store.used_transaction_ids().await.unwrap().contains("tx-1"));
        assert_eq!(f.store.current_count(today()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_publish_releases_quota_and_keeps_request() {
        let f = fixture(10).await;
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;
        f.publisher.fail_next_publishes(1).await;

        let outcome = f.service.publish_request(&request, "tx-1").await.unwrap();
        assert!(matches!(outcome, PublishOutcome::PublishFailed(_)));
        assert_eq!(f.store.current_count(today()).await.unwrap(), 0);
        assert_eq!(f.store.count_pending().await.unwrap(), 1);
        assert_eq!(f.store.count_confirmed().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn exhausted_quota_leaves_everything_untouched() {
        let f = fixture(1).await;
        assert!(f.store.try_claim(today(), 1).await.unwrap());
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;

        let outcome = f.service.publish_request(&request, "tx-1").await.unwrap();
        assert!(matches!(outcome, PublishOutcome::QuotaExhausted));
        assert_eq!(f.publisher.total_publishes().await, 0);
        assert_eq!(f.store.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn published_draft_is_never_sent_twice() {
        let f = fixture(10).await;
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;
        let publication = Publication {
            message_id: ChannelMessageId(55),
            published_at: Utc::now(),
        };
        assert!(f
            .store
            .attach_publication(&request.post_id, publication)
            .await
            .unwrap());

        let outcome = f.service.publish_request(&request, "tx-1").await.unwrap();
        assert!(matches!(outcome, PublishOutcome::AlreadyPublished(ChannelMessageId(55))));
        assert_eq!(f.publisher.total_publishes().await, 0);
        assert_eq!(f.store.count_pending().await.unwrap(), 0);
        assert_eq!(f.store.count_confirmed().await.unwrap(), 1);
        assert_eq!(f.store.current_count(today()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_publishes_of_one_draft_send_once() {
        let f = fixture(10).await;
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;
        f.publisher
            .set_publish_delay(std::time::Duration::from_millis(50))
            .await;

        let (a, b) = tokio::join!(
            f.service.publish_request(&request, "tx-1"),
            f.service.publish_free(OwnerId(7)),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        assert_eq!(
            outcomes.iter().filter(|o| o.message_id().is_some()).count(),
            1,
            "{outcomes:?}"
        );
        assert_eq!(f.publisher.publish_count(&request.post_id).await, 1);
    }

    #[tokio::test]
    async fn free_path_uses_latest_request() {
        let f = fixture(10).await;
        open_request(&f.store, "older", 7, "AAAAAA").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newest = open_request(&f.store, "newer", 7, "BBBBBB").await;

        let outcome = f.service.publish_free(OwnerId(7)).await.unwrap();
        assert!(outcome.message_id().is_some());
        let published = f.publisher.published().await;
        assert_eq!(published[0].0, newest.post_id);
        assert_eq!(f.store.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn free_path_without_request_has_nothing_to_publish() {
        let f = fixture(10).await;
        let outcome = f.service.publish_free(OwnerId(7)).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::NothingToPublish));
    }

    async fn publish_one(f: &Fixture, id: &str, owner: i64) -> PublishedPost {
        let request = open_request(&f.store, id, owner, &format!("CODE{id}")).await;
        let message_id = f
            .service
            .publish_request(&request, &format!("tx-{id}"))
            .await
            .unwrap()
            .message_id()
            .unwrap();
        f.store
            .find_published_by_message(message_id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn forbidden_delete_keeps_rows() {
        let f = fixture(10).await;
        let post = publish_one(&f, "p1", 7).await;
        f.publisher
            .set_delete_outcome(DeleteOutcome::Forbidden("message can't be deleted".into()))
            .await;

        let outcome = f.service.retract(&post).await.unwrap();
        assert!(matches!(outcome, DeletionOutcome::Kept(DeleteOutcome::Forbidden(_))));
        assert_eq!(f.store.count_confirmed().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_message_counts_as_deleted_once() {
        let f = fixture(10).await;
        let post = publish_one(&f, "p1", 7).await;
        f.publisher.set_delete_outcome(DeleteOutcome::NotFound).await;

        assert_eq!(f.service.retract(&post).await.unwrap(), DeletionOutcome::Removed);
        assert_eq!(
            f.service.retract(&post).await.unwrap(),
            DeletionOutcome::AlreadyCleaned
        );
        assert_eq!(f.store.count_confirmed().await.unwrap(), 0);
        assert!(f.store.get_draft(&post.record.post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_delete() {
        let f = fixture(10).await;
        let post = publish_one(&f, "p1", 7).await;
        let message_id = post.publication.message_id;

        assert_eq!(
            f.service.delete_post(OwnerId(8), false, message_id).await.unwrap(),
            DeletionOutcome::NotOwner
        );
        assert!(f.publisher.deleted().await.is_empty());
        assert_eq!(
            f.service.delete_post(OwnerId(1), true, message_id).await.unwrap(),
            DeletionOutcome::Removed
        );
    }

    #[tokio::test]
    async fn unknown_message_is_reported_not_raised() {
        let f = fixture(10).await;
        let outcome = f
            .service
            .delete_post(OwnerId(7), false, ChannelMessageId(999))
            .await
            .unwrap();
        assert_eq!(outcome, DeletionOutcome::NotFound);

        let outcome = f
            .service
            .delete_post(OwnerId(1), true, ChannelMessageId(999))
            .await
            .unwrap();
        assert_eq!(outcome, DeletionOutcome::Untracked(DeleteOutcome::Deleted));
    }

    #[tokio::test]
    async fn recovery_publishes_confirmations_without_message() {
        let f = fixture(10).await;
        let request = open_request(&f.store, "p1", 7, "AB12CD").await;
        let created: DateTime<Utc> = Utc::now() - Duration::minutes(5);
        let record = ConfirmedRecord {
            id: "legacy-1".into(),
            code: request.code.clone(),
            owner: request.owner,
            post_id: request.post_id.clone(),
            requested_at: created,
            transaction_id: Some("tx-legacy".into()),
        };
        adrelay_test_utils::fixtures::insert_unpublished_confirmation(&f.store, &record)
            .await
            .unwrap();

        let report = f.service.recover_unpublished().await.unwrap();
        assert_eq!(report, RecoveryReport { published: 1, deferred: 0 });
        let again = f.service.recover_unpublished().await.unwrap();
        assert_eq!(again, RecoveryReport::default());
        assert_eq!(f.publisher.publish_count(&request.post_id).await, 1);
    }
}
