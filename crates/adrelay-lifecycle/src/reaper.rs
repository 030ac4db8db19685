// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal of abandoned payment requests and drafts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use adrelay_core::{AdrelayError, Store};

use crate::metrics;
use crate::supervisor::CycleTask;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapReport {
    /// Unpaid requests deleted. Paid requests are never reaped.
    pub pending: u64,
    /// Unpublished drafts deleted once nothing refers to them.
    pub drafts: u64,
}

pub struct StaleReaper {
    store: Arc<dyn Store>,
    max_age: Duration,
}

impl StaleReaper {
    pub fn new(store: Arc<dyn Store>, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Delete stale requests first so their drafts become unreferenced,
    /// then the unpublished drafts of the same age.
    pub async fn reap(&self) -> Result<ReapReport, AdrelayError> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| AdrelayError::Config(format!("stale age out of range: {e}")))?;
        let cutoff = Utc::now() - max_age;

        let pending = self.store.delete_pending_before(cutoff).await?;
        let drafts = self.store.delete_unpublished_drafts_before(cutoff).await?;
        metrics::record_reaped("pending", pending);
        metrics::record_reaped("draft", drafts);
        Ok(ReapReport { pending, drafts })
    }
}

#[async_trait]
impl CycleTask for StaleReaper {
    fn name(&self) -> &'static str {
        "stale-reaper"
    }

    async fn run_cycle(&self) -> Result<(), AdrelayError> {
        let report = self.reap().await?;
        if report.pending > 0 || report.drafts > 0 {
            info!(
                pending = report.pending,
                drafts = report.drafts,
                "stale requests reaped"
            );
        }
        Ok(())
    }
}
