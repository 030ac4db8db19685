// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end lifecycle scenarios over a real SQLite database and mock
//! channel and bank collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use adrelay_core::{
    ChannelMessageId, ConfirmedStore, DeleteOutcome, DraftStore, OwnerId, PendingStore,
    Publication, QuotaCounter,
};
use adrelay_lifecycle::poller::QUOTA_EXHAUSTED_TEXT;
use adrelay_lifecycle::{spawn_periodic, ExpiryReport, PollReport, PublishOutcome, ReapReport};
use adrelay_test_utils::fixtures::transaction;
use adrelay_test_utils::TestHarness;

fn hours_ago(hours: i64) -> chrono::DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(hours)
}

#[tokio::test]
async fn scenario_a_matched_payment_is_published_and_confirmed() {
    let h = TestHarness::new().await.unwrap();
    let request = h.seed_request(OwnerId(11), "AB12CD", Utc::now()).await.unwrap();
    h.bank
        .push_transaction(transaction("tx-a", "payment AB12CD thanks", 2000))
        .await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.published, 1);

    assert!(h.store.used_transaction_ids().await.unwrap().contains("tx-a"));
    assert_eq!(h.store.count_pending().await.unwrap(), 0);
    let draft = h.store.get_draft(&request.post_id).await.unwrap().unwrap();
    assert!(draft.is_published());
    assert_eq!(h.publisher.total_publishes().await, 1);
}

#[tokio::test]
async fn scenario_b_one_slot_left_publishes_one_and_notifies_the_other() {
    let h = TestHarness::builder().with_daily_max(1).build().await.unwrap();
    let first = h.seed_request(OwnerId(1), "AAAAAA", Utc::now() - chrono::Duration::minutes(2)).await.unwrap();
    let second = h.seed_request(OwnerId(2), "BBBBBB", Utc::now()).await.unwrap();
    h.bank
        .set_transactions(vec![
            transaction("tx-1", "AAAAAA", 2000),
            transaction("tx-2", "for BBBBBB", 2000),
        ])
        .await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.quota_exhausted, 1);

    // Oldest request wins the last slot.
    let published = h.publisher.published().await;
    assert_eq!(published[0].0, first.post_id);
    let remaining = h.store.list_pending().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert_eq!(
        h.notifier.sent_to(OwnerId(2)).await,
        vec![QUOTA_EXHAUSTED_TEXT.to_string()]
    );

    // A second cycle on the same day does not repeat the notification.
    h.poller.poll_once().await.unwrap();
    assert_eq!(h.notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn scenario_c_expired_post_is_deleted_everywhere() {
    let h = TestHarness::builder().with_expiry_age_hours(45).build().await.unwrap();
    let post = h.seed_published(OwnerId(3), hours_ago(46)).await.unwrap();

    let report = h.expiry.sweep().await.unwrap();
    assert_eq!(report, ExpiryReport { expired: 1, deferred: 0 });
    assert_eq!(h.publisher.deleted().await, vec![post.publication.message_id]);
    assert_eq!(h.store.count_confirmed().await.unwrap(), 0);
    assert!(h.store.get_draft(&post.record.post_id).await.unwrap().is_none());
}

#[tokio::test]
async fn scenario_d_young_post_is_left_alone() {
    let h = TestHarness::builder().with_expiry_age_hours(45).build().await.unwrap();
    let post = h.seed_published(OwnerId(3), hours_ago(10)).await.unwrap();

    let report = h.expiry.sweep().await.unwrap();
    assert_eq!(report, ExpiryReport::default());
    assert!(h.publisher.deleted().await.is_empty());
    assert!(h
        .store
        .find_published_by_message(post.publication.message_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn scenario_e_stale_request_and_draft_are_reaped() {
    let h = TestHarness::builder()
        .with_stale_age(Duration::from_secs(3600))
        .build()
        .await
        .unwrap();
    let stale = h.seed_request(OwnerId(4), "STALE2", hours_ago(2)).await.unwrap();
    let fresh = h.seed_request(OwnerId(4), "FRESH2", Utc::now()).await.unwrap();

    let report = h.reaper.reap().await.unwrap();
    assert_eq!(report, ReapReport { pending: 1, drafts: 1 });
    assert!(h.store.get_draft(&stale.post_id).await.unwrap().is_none());
    assert!(h.store.get_draft(&fresh.post_id).await.unwrap().is_some());
    assert_eq!(h.store.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_publish_is_retried_next_cycle_and_published_once() {
    let h = TestHarness::new().await.unwrap();
    let request = h.seed_request(OwnerId(5), "RETRY9", Utc::now()).await.unwrap();
    h.bank.push_transaction(transaction("tx-r", "RETRY9", 2000)).await;
    h.publisher.fail_next_publishes(1).await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.store.count_pending().await.unwrap(), 1);
    assert_eq!(h.store.current_count(Utc::now().date_naive()).await.unwrap(), 0);

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.published, 1);

    // The statement still lists the transaction, but it is consumed now.
    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report, PollReport::default());
    assert_eq!(h.publisher.publish_count(&request.post_id).await, 2);
    assert_eq!(h.publisher.total_publishes().await, 1);
    assert_eq!(h.store.current_count(Utc::now().date_naive()).await.unwrap(), 1);
}

#[tokio::test]
async fn draft_pinned_before_a_crash_is_finalized_not_reposted() {
    let h = TestHarness::new().await.unwrap();
    let request = h.seed_request(OwnerId(6), "CRASH7", Utc::now()).await.unwrap();
    // The post went out and its id was pinned, but the process died before
    // the confirmation was written.
    let publication = Publication {
        message_id: ChannelMessageId(77),
        published_at: Utc::now(),
    };
    assert!(h
        .store
        .attach_publication(&request.post_id, publication)
        .await
        .unwrap());
    h.bank.push_transaction(transaction("tx-c", "CRASH7", 2000)).await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(h.publisher.total_publishes().await, 0);
    assert_eq!(h.store.count_pending().await.unwrap(), 0);
    let post = h
        .store
        .find_published_by_message(ChannelMessageId(77))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.record.transaction_id.as_deref(), Some("tx-c"));
}

#[tokio::test]
async fn forbidden_or_failed_deletion_keeps_the_record() {
    let h = TestHarness::builder().with_expiry_age_hours(45).build().await.unwrap();
    let post = h.seed_published(OwnerId(7), hours_ago(47)).await.unwrap();

    for outcome in [
        DeleteOutcome::Forbidden("message can't be deleted".into()),
        DeleteOutcome::Failed("timeout".into()),
    ] {
        h.publisher.set_delete_outcome(outcome).await;
        let report = h.expiry.sweep().await.unwrap();
        assert_eq!(report, ExpiryReport { expired: 0, deferred: 1 });
        assert!(h
            .store
            .find_published_by_message(post.publication.message_id)
            .await
            .unwrap()
            .is_some());
    }
}

#[tokio::test]
async fn already_removed_message_is_cleaned_exactly_once() {
    let h = TestHarness::builder().with_expiry_age_hours(45).build().await.unwrap();
    h.seed_published(OwnerId(8), hours_ago(50)).await.unwrap();
    h.publisher.set_delete_outcome(DeleteOutcome::NotFound).await;

    assert_eq!(h.expiry.sweep().await.unwrap().expired, 1);
    assert_eq!(h.expiry.sweep().await.unwrap(), ExpiryReport::default());
    assert_eq!(h.store.count_confirmed().await.unwrap(), 0);
    assert_eq!(h.publisher.deleted().await.len(), 1);
}

#[tokio::test]
async fn underpaid_or_foreign_currency_transfers_do_not_match() {
    let h = TestHarness::new().await.unwrap();
    h.seed_request(OwnerId(9), "CHEAP3", Utc::now()).await.unwrap();
    let mut dollars = transaction("tx-usd", "CHEAP3", 5000);
    dollars.currency = 840;
    h.bank
        .set_transactions(vec![transaction("tx-low", "CHEAP3", 1000), dollars])
        .await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(h.store.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn code_typed_in_cyrillic_still_matches() {
    let h = TestHarness::new().await.unwrap();
    h.seed_request(OwnerId(10), "KOTA45", Utc::now()).await.unwrap();
    h.bank
        .push_transaction(transaction("tx-cyr", "оплата КОТА45", 2000))
        .await;

    assert_eq!(h.poller.poll_once().await.unwrap().published, 1);
}

#[tokio::test]
async fn bank_outage_fails_the_cycle_without_touching_requests() {
    let h = TestHarness::new().await.unwrap();
    h.seed_request(OwnerId(12), "OUTAGE", Utc::now()).await.unwrap();
    h.bank.fail_next_fetch().await;

    assert!(h.poller.poll_once().await.is_err());
    assert_eq!(h.store.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn empty_queue_skips_the_statement_fetch() {
    let h = TestHarness::new().await.unwrap();
    h.poller.poll_once().await.unwrap();
    assert!(h.bank.fetches().await.is_empty());
}

#[tokio::test]
async fn intake_then_free_publication_then_owner_deletion() {
    let h = TestHarness::new().await.unwrap();
    let owner = OwnerId(13);
    let (draft, _) = h
        .intake
        .open_request(owner, adrelay_test_utils::fixtures::sample_ad("Stroller"))
        .await
        .unwrap();

    let outcome = h.publication.publish_free(owner).await.unwrap();
    let message_id = outcome.message_id().unwrap();
    let post = h.store.find_published_by_message(message_id).await.unwrap().unwrap();
    assert_eq!(post.record.post_id, draft.id);
    assert_eq!(post.record.code, adrelay_core::FREE_CODE);
    assert!(post.record.transaction_id.is_none());

    let deleted = h.publication.delete_post(owner, false, message_id).await.unwrap();
    assert_eq!(deleted, adrelay_lifecycle::DeletionOutcome::Removed);
    assert_eq!(h.store.count_confirmed().await.unwrap(), 0);
}

#[tokio::test]
async fn supervised_poller_publishes_until_cancelled() {
    let h = TestHarness::new().await.unwrap();
    h.seed_request(OwnerId(14), "LOOP42", Utc::now()).await.unwrap();
    h.bank.push_transaction(transaction("tx-loop", "LOOP42", 2000)).await;

    let cancel = CancellationToken::new();
    let handle = spawn_periodic(
        Arc::clone(&h.poller) as Arc<dyn adrelay_lifecycle::CycleTask>,
        Duration::from_millis(20),
        cancel.clone(),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.publisher.total_publishes().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("poller never published");

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(h.publisher.total_publishes().await, 1);
}

#[tokio::test]
async fn paid_request_blocked_by_quota_outlives_the_reaper() {
    let h = TestHarness::builder()
        .with_daily_max(1)
        .with_stale_age(Duration::from_secs(3600))
        .build()
        .await
        .unwrap();
    let today = Utc::now().date_naive();
    assert!(h.store.try_claim(today, 1).await.unwrap());
    let request = h
        .seed_request(OwnerId(15), "WAIT77", Utc::now() - chrono::Duration::minutes(70))
        .await
        .unwrap();
    h.bank.push_transaction(transaction("tx-wait", "WAIT77", 2000)).await;

    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.quota_exhausted, 1);
    let pending = h.store.list_pending().await.unwrap();
    assert_eq!(pending[0].transaction_id.as_deref(), Some("tx-wait"));

    assert_eq!(h.reaper.reap().await.unwrap(), ReapReport::default());
    assert_eq!(h.store.count_pending().await.unwrap(), 1);
    assert!(h.store.get_draft(&request.post_id).await.unwrap().is_some());

    // A slot frees up after the transfer has left the statement window.
    assert!(h.store.release(today).await.unwrap());
    h.bank.set_transactions(Vec::new()).await;
    let report = h.poller.poll_once().await.unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(h.store.count_pending().await.unwrap(), 0);
    assert!(h.store.used_transaction_ids().await.unwrap().contains("tx-wait"));
}

#[tokio::test]
async fn reaper_during_a_paid_publish_leaves_the_post_tracked() {
    let h = TestHarness::builder()
        .with_stale_age(Duration::from_secs(3600))
        .build()
        .await
        .unwrap();
    let request = h
        .seed_request(OwnerId(16), "RACE61", Utc::now() - chrono::Duration::minutes(61))
        .await
        .unwrap();
    h.bank.push_transaction(transaction("tx-race", "RACE61", 2000)).await;
    h.publisher.set_publish_delay(Duration::from_millis(300)).await;

    let poller = Arc::clone(&h.poller);
    let poll = tokio::spawn(async move { poller.poll_once().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let reaped = h.reaper.reap().await.unwrap();
    let report = poll.await.unwrap().unwrap();

    assert_eq!(reaped, ReapReport::default());
    assert_eq!(report.published, 1);
    assert_eq!(h.store.count_confirmed().await.unwrap(), 1);
    assert!(h.store.get_draft(&request.post_id).await.unwrap().unwrap().is_published());
    assert!(h.publisher.deleted().await.is_empty());
}

#[tokio::test]
async fn free_post_whose_draft_is_reaped_midway_is_withdrawn() {
    let h = TestHarness::builder()
        .with_stale_age(Duration::from_secs(3600))
        .build()
        .await
        .unwrap();
    let owner = OwnerId(17);
    h.seed_request(owner, "FREE61", Utc::now() - chrono::Duration::minutes(61))
        .await
        .unwrap();
    h.publisher.set_publish_delay(Duration::from_millis(300)).await;

    let publication = Arc::clone(&h.publication);
    let publish = tokio::spawn(async move { publication.publish_free(owner).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.reaper.reap().await.unwrap(), ReapReport { pending: 1, drafts: 1 });

    let outcome = publish.await.unwrap().unwrap();
    assert!(matches!(outcome, PublishOutcome::Withdrawn));
    let posted = h.publisher.published().await;
    assert_eq!(posted.len(), 1);
    assert_eq!(h.publisher.deleted().await, vec![posted[0].1]);
    assert_eq!(h.store.current_count(Utc::now().date_naive()).await.unwrap(), 0);
    assert_eq!(h.store.count_confirmed().await.unwrap(), 0);
}
