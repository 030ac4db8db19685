// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The payment poller: recover, fetch, match, publish.
//!
//! A request moves from unpaid to paid when a statement transaction carries
//! its code; the transaction id is stored on the request at that point.
//! Paid requests are retried every cycle until they publish, whatever the
//! quota or the age of the transfer.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use tracing::{debug, info, warn};

use adrelay_core::{
    AdrelayError, BankStatementClient, Notifier, OwnerId, PendingRequest, Store, Transaction,
};
use adrelay_payments::{match_payments, MatchPolicy};

use crate::metrics;
use crate::publication::{PublicationService, PublishOutcome};
use crate::supervisor::CycleTask;

/// Sent when a paid request cannot be published because the day is full.
pub const QUOTA_EXHAUSTED_TEXT: &str =
    "❌ Оплату отримано, але денний ліміт публікацій вичерпано. \
     Оголошення буде опубліковано, щойно з'явиться вільне місце.";

/// Tally of one poller cycle.
#[deny(missing_docs)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Confirmations without a channel message that were published again.
    pub recovered: usize,
    /// Unpaid requests newly paired with a transaction this cycle.
    pub matched: usize,
    /// Paid requests that reached the channel (or were already there).
    pub published: usize,
    /// Paid requests left waiting because today's quota is used up.
    pub quota_exhausted: usize,
    /// Paid requests whose publish failed; they are retried next cycle.
    pub failed: usize,
}

pub struct PaymentPoller {
    store: Arc<dyn Store>,
    bank: Arc<dyn BankStatementClient>,
    publication: Arc<PublicationService>,
    notifier: Arc<dyn Notifier>,
    policy: MatchPolicy,
    lookback: Duration,
    /// (pending request id, day) pairs already told about the full quota.
    notified: Mutex<HashSet<(String, NaiveDate)>>,
}

impl PaymentPoller {
    pub fn new(
        store: Arc<dyn Store>,
        bank: Arc<dyn BankStatementClient>,
        publication: Arc<PublicationService>,
        notifier: Arc<dyn Notifier>,
        policy: MatchPolicy,
        lookback: Duration,
    ) -> Self {
        Self {
            store,
            bank,
            publication,
            notifier,
            policy,
            lookback,
            notified: Mutex::new(HashSet::new()),
        }
    }

    /// Run one full cycle.
    ///
    /// Requests that were already paid on an earlier cycle are published
    /// straight away; the bank is asked only about the unpaid ones. A new
    /// match is written to the request before publishing, so neither the
    /// reaper nor a later statement can lose it.
    ///
    /// Per-pair failures are counted in the report. Only failures that
    /// stop the whole cycle (store unreachable, bank feed down) are returned
    /// as errors; the next cycle retries from scratch.
    pub async fn poll_once(&self) -> Result<PollReport, AdrelayError> {
        let mut report = PollReport::default();

        match self.publication.recover_unpublished().await {
            Ok(recovery) => report.recovered = recovery.published,
            Err(e) => warn!(error = %e, "recovery step failed (non-fatal)"),
        }

        let pending = self.store.list_pending().await?;
        if pending.is_empty() {
            debug!("no pending requests, skipping statement fetch");
            return Ok(report);
        }

        let mut paid: Vec<(PendingRequest, String)> = Vec::new();
        let mut unpaid: Vec<PendingRequest> = Vec::new();
        for request in pending {
            match request.transaction_id.clone() {
                Some(transaction_id) => paid.push((request, transaction_id)),
                None => unpaid.push(request),
            }
        }

        if !unpaid.is_empty() {
            let transactions: Vec<Transaction> = self
                .bank
                .fetch_transactions(self.lookback)
                .await?
                .try_collect()
                .await?;
            let mut consumed = self.store.used_transaction_ids().await?;
            consumed.extend(paid.iter().map(|(_, id)| id.clone()));

            let matches = match_payments(&unpaid, &transactions, &consumed, &self.policy);
            report.matched = matches.len();
            metrics::record_payments_matched(matches.len());
            debug!(
                unpaid = unpaid.len(),
                transactions = transactions.len(),
                matched = matches.len(),
                "statement matched"
            );

            for found in matches {
                let request = found.request;
                let transaction_id = found.transaction.id;
                info!(
                    code = %request.code,
                    post_id = %request.post_id,
                    transaction_id = %transaction_id,
                    "payment matched"
                );
                if !self.store.mark_pending_paid(&request.id, &transaction_id).await? {
                    // Cancelled or reaped since the list was read.
                    warn!(
                        code = %request.code,
                        transaction_id = %transaction_id,
                        "matched request vanished before it could be marked paid"
                    );
                    continue;
                }
                paid.push((request, transaction_id));
            }
        }

        let today = Utc::now().date_naive();
        for (request, transaction_id) in &paid {
            match self.publication.publish_request(request, transaction_id).await {
                Ok(PublishOutcome::Published(_) | PublishOutcome::AlreadyPublished(_)) => {
                    report.published += 1;
                }
                Ok(PublishOutcome::QuotaExhausted) => {
                    report.quota_exhausted += 1;
                    self.notify_quota_exhausted(&request.id, request.owner, today)
                        .await;
                }
                Ok(PublishOutcome::PublishFailed(_) | PublishOutcome::Withdrawn) => {
                    report.failed += 1;
                }
                Ok(outcome) => {
                    debug!(code = %request.code, ?outcome, "paid request skipped this cycle");
                }
                Err(e) => {
                    warn!(
                        code = %request.code,
                        transaction_id = %transaction_id,
                        error = %e,
                        "publishing paid request failed (non-fatal)"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Tell the requester once per day that their paid post is waiting.
    async fn notify_quota_exhausted(&self, request_id: &str, owner: OwnerId, today: NaiveDate) {
        {
            let mut notified = self.notified.lock().unwrap_or_else(PoisonError::into_inner);
            notified.retain(|(_, day)| *day == today);
            if !notified.insert((request_id.to_string(), today)) {
                return;
            }
        }
        if let Err(e) = self.notifier.notify(owner, QUOTA_EXHAUSTED_TEXT).await {
            warn!(owner_id = %owner, error = %e, "quota notification failed (non-fatal)");
        }
    }
}

#[async_trait]
impl CycleTask for PaymentPoller {
    fn name(&self) -> &'static str {
        "payment-poller"
    }

    async fn run_cycle(&self) -> Result<(), AdrelayError> {
        let report = self.poll_once().await?;
        if report.matched > 0 || report.recovered > 0 {
            info!(
                matched = report.matched,
                published = report.published,
                recovered = report.recovered,
                quota_exhausted = report.quota_exhausted,
                failed = report.failed,
                "payment poll complete"
            );
        }
        Ok(())
    }
}
