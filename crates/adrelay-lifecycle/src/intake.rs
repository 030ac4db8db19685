// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning parsed listings into drafts with payment codes.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use adrelay_core::{AdData, AdrelayError, Draft, OwnerId, PendingRequest, PostId, Store};
use adrelay_payments::{CodeGenerator, MAX_CODE_ATTEMPTS};

/// Today's quota usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Posts published today.
    pub used: u32,
    /// Daily limit from config.
    pub max: u32,
    /// Slots left today, never negative.
    pub remaining: u32,
}

impl QuotaSnapshot {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

pub struct IntakeService {
    store: Arc<dyn Store>,
    codes: CodeGenerator,
    placeholder_image_url: String,
    daily_max: u32,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn Store>,
        codes: CodeGenerator,
        placeholder_image_url: impl Into<String>,
        daily_max: u32,
    ) -> Self {
        Self {
            store,
            codes,
            placeholder_image_url: placeholder_image_url.into(),
            daily_max,
        }
    }

    /// Save a draft for `owner` and open a payment request for it.
    ///
    /// Codes are retried on collision; running out of attempts is an
    /// internal error.
    pub async fn open_request(
        &self,
        owner: OwnerId,
        mut ad: AdData,
    ) -> Result<(Draft, PendingRequest), AdrelayError> {
        if ad.image_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            ad.image_url = Some(self.placeholder_image_url.clone());
        }

        let now = Utc::now();
        let draft = Draft::from_ad(PostId(uuid::Uuid::new_v4().to_string()), owner, ad, now);
        self.store.save_draft(&draft).await?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let request = PendingRequest {
                id: uuid::Uuid::new_v4().to_string(),
                code: self.codes.generate(),
                owner,
                post_id: draft.id.clone(),
                created_at: now,
                transaction_id: None,
            };
            if self.store.insert_pending(&request).await? {
                info!(
                    owner_id = %owner,
                    post_id = %draft.id,
                    code = %request.code,
                    "payment request opened"
                );
                return Ok((draft, request));
            }
            debug!(attempt, "payment code collision, retrying");
        }

        Err(AdrelayError::Internal(format!(
            "no free payment code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Drop every unpublished draft of `owner`. Their requests go with them.
    pub async fn cancel(&self, owner: OwnerId) -> Result<u64, AdrelayError> {
        let removed = self.store.delete_unpublished_drafts_for_owner(owner).await?;
        info!(owner_id = %owner, removed, "publication cancelled");
        Ok(removed)
    }

    pub async fn quota_snapshot(&self) -> Result<QuotaSnapshot, AdrelayError> {
        let used = self.store.current_count(Utc::now().date_naive()).await?;
        Ok(QuotaSnapshot {
            used,
            max: self.daily_max,
            remaining: self.daily_max.saturating_sub(used),
        })
    }
}
