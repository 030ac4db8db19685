// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline button payloads.

use adrelay_core::ChannelMessageId;

const PUBLISH_FREE: &str = "publish_free";
const CANCEL: &str = "cancel";
const DELETE_PREFIX: &str = "delete_post_msg_";

/// What an inline button asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Publish the requester's latest draft without payment.
    PublishFree,
    /// Drop the requester's unpublished drafts.
    Cancel,
    /// Remove a channel post.
    DeletePost(ChannelMessageId),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            PUBLISH_FREE => Some(Self::PublishFree),
            CANCEL => Some(Self::Cancel),
            _ => data
                .strip_prefix(DELETE_PREFIX)
                .and_then(|id| id.parse::<i32>().ok())
                .map(|id| Self::DeletePost(ChannelMessageId(id))),
        }
    }

    pub fn data(&self) -> String {
        match self {
            Self::PublishFree => PUBLISH_FREE.to_string(),
            Self::Cancel => CANCEL.to_string(),
            Self::DeletePost(id) => format!("{DELETE_PREFIX}{id}"),
        }
    }
}
