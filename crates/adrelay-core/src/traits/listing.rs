// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marketplace listing extraction.

use async_trait::async_trait;

use crate::error::AdrelayError;
use crate::types::AdData;

/// Turns a listing URL into structured ad data.
#[async_trait]
pub trait ListingParser: Send + Sync {
    async fn parse(&self, url: &str) -> Result<AdData, AdrelayError>;
}
