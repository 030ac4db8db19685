// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal of published posts once they pass the age threshold.
//!
//! The threshold sits below the platform's 48 hour limit on bot deletions.
//! Posts the channel refuses to delete stay recorded and are retried on the
//! next sweep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use adrelay_core::{AdrelayError, Store};

use crate::metrics;
use crate::publication::{DeletionOutcome, PublicationService};
use crate::supervisor::CycleTask;

/// Tally of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryReport {
    /// Posts deleted from the channel and the store.
    pub expired: usize,
    /// Posts the channel kept; their rows stay for the next cycle.
    pub deferred: usize,
}

pub struct ExpiryCleaner {
    store: Arc<dyn Store>,
    publication: Arc<PublicationService>,
    max_age: Duration,
}

impl ExpiryCleaner {
    pub fn new(store: Arc<dyn Store>, publication: Arc<PublicationService>, max_age: Duration) -> Self {
        Self {
            store,
            publication,
            max_age,
        }
    }

    pub async fn sweep(&self) -> Result<ExpiryReport, AdrelayError> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| AdrelayError::Config(format!("expiry age out of range: {e}")))?;
        let cutoff = Utc::now() - max_age;
        let mut report = ExpiryReport::default();

        for post in self.store.list_published_before(cutoff).await? {
            match self.publication.retract(&post).await {
                Ok(DeletionOutcome::Removed | DeletionOutcome::AlreadyCleaned) => {
                    metrics::record_post_expired();
                    report.expired += 1;
                }
                Ok(_) => {
                    metrics::record_expiry_deferred();
                    report.deferred += 1;
                }
                Err(e) => {
                    warn!(
                        message_id = %post.publication.message_id,
                        error = %e,
                        "expiry cleanup failed (non-fatal)"
                    );
                    metrics::record_expiry_deferred();
                    report.deferred += 1;
                }
            }
        }
        Ok(report)
    }
}

#[async_trait]
impl CycleTask for ExpiryCleaner {
    fn name(&self) -> &'static str {
        "expiry-cleaner"
    }

    async fn run_cycle(&self) -> Result<(), AdrelayError> {
        let report = self.sweep().await?;
        if report.expired > 0 || report.deferred > 0 {
            info!(
                expired = report.expired,
                deferred = report.deferred,
                "expired posts swept"
            );
        }
        Ok(())
    }
}
