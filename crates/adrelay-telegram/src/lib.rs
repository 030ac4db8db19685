// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram adapter for adrelay.
//!
//! [`TelegramChannel`] posts drafts to the target channel, removes them
//! again, messages users directly and answers subscription checks, all over
//! teloxide. The [`handler`] module holds the bot's conversation with users.

pub mod callbacks;
pub mod caption;
pub mod handler;
pub mod keyboards;
pub mod texts;

pub use handler::{run_dispatcher, schema, BotDeps, Command};

use async_trait::async_trait;
use adrelay_config::model::TelegramConfig;
use adrelay_core::error::AdrelayError;
use adrelay_core::traits::{MembershipChecker, Notifier, PluginAdapter, Publisher};
use adrelay_core::types::{AdapterType, ChannelMessageId, DeleteOutcome, Draft, HealthStatus, OwnerId};
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, Recipient};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info, warn};

use crate::caption::build_caption;
use crate::keyboards::delete_button;

/// Telegram adapter implementing [`Publisher`], [`Notifier`] and
/// [`MembershipChecker`] for one target channel.
pub struct TelegramChannel {
    bot: Bot,
    channel: Recipient,
    bot_username: String,
}

impl TelegramChannel {
    /// Creates the adapter.
    ///
    /// Requires `config.bot_token` and `config.channel` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, AdrelayError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AdrelayError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;
        if token.is_empty() {
            return Err(AdrelayError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let channel = config
            .channel
            .as_deref()
            .ok_or_else(|| AdrelayError::Config("telegram.channel is required".into()))
            .and_then(channel_recipient)?;

        Ok(Self {
            bot: Bot::new(token),
            channel,
            bot_username: config.bot_username,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Parses `@username` or a numeric chat id into a recipient.
pub fn channel_recipient(channel: &str) -> Result<Recipient, AdrelayError> {
    let channel = channel.trim();
    if let Ok(id) = channel.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    match channel.strip_prefix('@') {
        Some(name) if !name.is_empty() => Ok(Recipient::ChannelUsername(channel.to_string())),
        _ => Err(AdrelayError::Config(format!(
            "telegram.channel must be @username or a numeric chat id, got {channel:?}"
        ))),
    }
}

/// Maps a failed post to a retryable or permanent error.
fn publish_error(e: RequestError) -> AdrelayError {
    let refused = matches!(
        e,
        RequestError::Api(
            ApiError::ChatNotFound | ApiError::BotKicked | ApiError::NotEnoughRightsToPostMessages,
        )
    );
    if refused {
        AdrelayError::Rejected {
            message: format!("channel refused the post: {e}"),
        }
    } else {
        AdrelayError::Channel {
            message: format!("failed to post to channel: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn delete_outcome(e: &RequestError) -> DeleteOutcome {
    match e {
        RequestError::Api(ApiError::MessageToDeleteNotFound) => DeleteOutcome::NotFound,
        RequestError::Api(ApiError::MessageCantBeDeleted) => DeleteOutcome::Forbidden(e.to_string()),
        RequestError::Api(api) => {
            let text = api.to_string().to_lowercase();
            if text.contains("rights") || text.contains("can't be deleted") {
                DeleteOutcome::Forbidden(e.to_string())
            } else {
                DeleteOutcome::Failed(e.to_string())
            }
        }
        _ => DeleteOutcome::Failed(e.to_string()),
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, AdrelayError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), AdrelayError> {
        debug!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl Publisher for TelegramChannel {
    async fn publish(&self, draft: &Draft) -> Result<ChannelMessageId, AdrelayError> {
        let caption = build_caption(draft, &self.bot_username);
        let photo = draft.image_url.as_deref().and_then(|url| Url::parse(url).ok());

        let sent = match photo {
            Some(url) => {
                self.bot
                    .send_photo(self.channel.clone(), InputFile::url(url))
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .await
            }
            None => {
                self.bot
                    .send_message(self.channel.clone(), caption)
                    .parse_mode(ParseMode::Html)
                    .await
            }
        }
        .map_err(publish_error)?;

        let message_id = ChannelMessageId(sent.id.0);
        info!(post_id = %draft.id, message_id = %message_id, "posted to channel");

        if let Err(e) = self
            .bot
            .edit_message_reply_markup(self.channel.clone(), sent.id)
            .reply_markup(delete_button(message_id))
            .await
        {
            warn!(message_id = %message_id, error = %e, "attaching delete button failed (non-fatal)");
        }

        Ok(message_id)
    }

    async fn delete(&self, message_id: ChannelMessageId) -> DeleteOutcome {
        match self
            .bot
            .delete_message(self.channel.clone(), MessageId(message_id.0))
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(e) => {
                let outcome = delete_outcome(&e);
                debug!(message_id = %message_id, ?outcome, "channel delete refused");
                outcome
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn notify(&self, owner: OwnerId, text: &str) -> Result<(), AdrelayError> {
        self.bot
            .send_message(ChatId(owner.0), text)
            .await
            .map_err(|e| AdrelayError::Channel {
                message: format!("failed to message user: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

#[async_trait]
impl MembershipChecker for TelegramChannel {
    async fn is_subscribed(&self, owner: OwnerId) -> Result<bool, AdrelayError> {
        let Ok(user) = u64::try_from(owner.0) else {
            return Ok(false);
        };
        match self
            .bot
            .get_chat_member(self.channel.clone(), UserId(user))
            .await
        {
            Ok(member) => Ok(member.kind.is_present()),
            Err(RequestError::Api(ApiError::UserNotFound)) => Ok(false),
            Err(e) => Err(AdrelayError::Channel {
                message: format!("membership check failed: {e}"),
                source: Some(Box::new(e)),
            }),
        }
    }
}
