// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging platform collaborators: the target channel and direct messages.

use async_trait::async_trait;

use crate::error::AdrelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelMessageId, DeleteOutcome, Draft, OwnerId};

/// Posts drafts to the configured channel and removes them again.
///
/// Publishing is not idempotent: calling it twice for the same draft posts
/// twice, so callers check the draft's publication state first.
#[async_trait]
pub trait Publisher: PluginAdapter {
    /// Sends the draft to the channel and returns the new message id.
    async fn publish(&self, draft: &Draft) -> Result<ChannelMessageId, AdrelayError>;

    /// Removes a channel message.
    async fn delete(&self, message_id: ChannelMessageId) -> DeleteOutcome;
}

/// Best-effort direct messages to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner: OwnerId, text: &str) -> Result<(), AdrelayError>;
}

/// Checks whether a user is subscribed to the target channel.
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_subscribed(&self, owner: OwnerId) -> Result<bool, AdrelayError>;
}
