// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stores, the collaborators, and the lifecycle tasks.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Code recorded on confirmations that were published without payment.
pub const FREE_CODE: &str = "FREE";

/// Chat identifier of the user who submitted a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a draft post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a message posted to the target channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMessageId(pub i32);

impl fmt::Display for ChannelMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured listing data produced by a [`ListingParser`](crate::ListingParser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdData {
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source_url: String,
}

/// Where and when a draft landed in the channel.
///
/// A draft either has both values or neither, so they travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub message_id: ChannelMessageId,
    pub published_at: DateTime<Utc>,
}

/// An ad post captured from a source listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: PostId,
    pub owner: OwnerId,
    pub title: String,
    pub price: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub publication: Option<Publication>,
}

impl Draft {
    /// Builds an unpublished draft from parsed listing data.
    pub fn from_ad(id: PostId, owner: OwnerId, ad: AdData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            title: ad.title,
            price: ad.price,
            description: ad.description,
            image_url: ad.image_url,
            source_url: ad.source_url,
            created_at,
            publication: None,
        }
    }

    pub fn is_published(&self) -> bool {
        self.publication.is_some()
    }
}

/// An outstanding request to publish a draft, awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    pub code: String,
    pub owner: OwnerId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
    pub transaction_id: Option<String>,
}

/// Proof that a draft was published, paid or free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedRecord {
    pub id: String,
    pub code: String,
    pub owner: OwnerId,
    pub post_id: PostId,
    pub requested_at: DateTime<Utc>,
    /// `None` for free publications.
    pub transaction_id: Option<String>,
}

/// A confirmed record joined with the channel message it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub record: ConfirmedRecord,
    pub publication: Publication,
}

/// Everything written atomically once the channel accepted a post.
#[derive(Debug, Clone)]
pub struct NewConfirmation {
    pub record: ConfirmedRecord,
    pub publication: Publication,
    /// Pending request consumed by this publication, if any.
    pub consumed_pending: Option<String>,
}

/// Publication count for one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub day: NaiveDate,
    pub count: u32,
}

/// A bank statement line. Read-only to this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub comment: String,
    /// Amount in minor units (kopiyky for UAH).
    pub amount: i64,
    /// ISO 4217 numeric currency code.
    pub currency: u16,
}

/// Result of asking the channel to remove a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The message was already gone.
    NotFound,
    /// The platform refused (too old, missing rights).
    Forbidden(String),
    Failed(String),
}

impl DeleteOutcome {
    /// True when the message is no longer in the channel.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Deleted | Self::NotFound)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Channel,
    Bank,
    Parser,
}
