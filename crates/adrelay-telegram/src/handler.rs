// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update routing: commands, menu buttons, listing links and inline buttons.
//!
//! Only private chats reach the message branch. Callback queries come from
//! both private chats (request buttons) and the channel (delete buttons).

use std::sync::Arc;
use std::time::Duration;

use adrelay_config::model::PaymentConfig;
use adrelay_core::{ChannelMessageId, Draft, ListingParser, MembershipChecker, OwnerId};
use adrelay_lifecycle::{IntakeService, PublicationService};
use adrelay_listing::{extract_url, Platform};
use reqwest::Url;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InputFile, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::callbacks::CallbackAction;
use crate::caption::build_caption;
use crate::keyboards;
use crate::texts;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), HandlerError>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Доступні команди:")]
pub enum Command {
    #[command(description = "головне меню")]
    Start,
    #[command(description = "видалити пост за ID: /delete <id>")]
    Delete(String),
    #[command(description = "ліміт публікацій на сьогодні")]
    Quota,
}

/// Everything the handlers need, shared across updates.
pub struct BotDeps {
    pub intake: Arc<IntakeService>,
    pub publication: Arc<PublicationService>,
    pub parser: Arc<dyn ListingParser>,
    pub membership: Arc<dyn MembershipChecker>,
    pub payment: PaymentConfig,
    pub admin_chat_id: i64,
    pub bot_username: String,
    pub channel_url: Option<Url>,
}

impl BotDeps {
    pub fn is_admin(&self, owner: OwnerId) -> bool {
        owner.0 == self.admin_chat_id
    }
}

/// Builds the update handler tree.
pub fn schema() -> UpdateHandler<HandlerError> {
    let messages = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_message));

    dptree::entry()
        .branch(messages)
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

/// Runs long polling until `cancel` fires.
pub async fn run_dispatcher(bot: Bot, deps: Arc<BotDeps>, cancel: CancellationToken) {
    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    let stopper = tokio::spawn(async move {
        cancel.cancelled().await;
        // Shutdown is refused while the dispatcher is still starting up.
        loop {
            match token.shutdown() {
                Ok(done) => {
                    done.await;
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    });

    info!("starting Telegram long polling");
    dispatcher.dispatch().await;
    stopper.abort();
    info!("Telegram dispatcher stopped");
}

fn parse_message_id(arg: &str) -> Option<ChannelMessageId> {
    arg.trim().parse::<i32>().ok().filter(|id| *id > 0).map(ChannelMessageId)
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: Arc<BotDeps>) -> HandlerResult {
    let chat = msg.chat.id;
    let owner = OwnerId(chat.0);

    match cmd {
        Command::Start => {
            bot.send_message(chat, texts::WELCOME)
                .reply_markup(keyboards::main_menu())
                .await?;
        }
        Command::Quota => {
            let text = match deps.intake.quota_snapshot().await {
                Ok(snapshot) => texts::quota_status(&snapshot),
                Err(e) => {
                    warn!(error = %e, "quota lookup failed");
                    texts::TRY_LATER.to_string()
                }
            };
            bot.send_message(chat, text).await?;
        }
        Command::Delete(arg) => {
            if !deps.is_admin(owner) {
                bot.send_message(chat, texts::UNKNOWN_COMMAND).await?;
                return Ok(());
            }
            let Some(message_id) = parse_message_id(&arg) else {
                bot.send_message(chat, texts::DELETE_USAGE).await?;
                return Ok(());
            };
            let text = match deps.publication.delete_post(owner, true, message_id).await {
                Ok(outcome) => {
                    info!(message_id = %message_id, ?outcome, "admin delete");
                    texts::deletion_result(&outcome)
                }
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "admin delete failed");
                    texts::TRY_LATER.to_string()
                }
            };
            bot.send_message(chat, text).await?;
        }
    }
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let Some(text) = msg.text().or_else(|| msg.caption()) else {
        return Ok(());
    };
    let chat = msg.chat.id;
    let owner = OwnerId(chat.0);

    match text.trim() {
        keyboards::PUBLISH_BUTTON => {
            let reply = match deps.intake.quota_snapshot().await {
                Ok(snapshot) => texts::publish_prompt(&snapshot),
                Err(e) => {
                    warn!(error = %e, "quota lookup failed");
                    texts::TRY_LATER.to_string()
                }
            };
            bot.send_message(chat, reply).await?;
            return Ok(());
        }
        keyboards::CHANNEL_BUTTON => {
            match &deps.channel_url {
                Some(url) => {
                    bot.send_message(chat, texts::CHANNEL_BUTTON_REPLY)
                        .reply_markup(keyboards::channel_link(url))
                        .await?;
                }
                None => {
                    bot.send_message(chat, texts::NO_CHANNEL_LINK).await?;
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let Some(url) = extract_url(text) else {
        bot.send_message(chat, texts::SEND_LINK).await?;
        return Ok(());
    };
    let Some(platform) = Platform::detect(&url) else {
        debug!(owner_id = %owner, url = %url, "unsupported marketplace");
        bot.send_message(chat, texts::UNSUPPORTED_SITE).await?;
        return Ok(());
    };

    let ad = match deps.parser.parse(&url).await {
        Ok(ad) => ad,
        Err(e) => {
            warn!(owner_id = %owner, %platform, url = %url, error = %e, "listing parse failed");
            bot.send_message(chat, texts::PARSE_FAILED).await?;
            return Ok(());
        }
    };

    let (draft, request) = match deps.intake.open_request(owner, ad).await {
        Ok(opened) => opened,
        Err(e) => {
            warn!(owner_id = %owner, error = %e, "opening publication request failed");
            bot.send_message(chat, texts::TRY_LATER).await?;
            return Ok(());
        }
    };
    info!(owner_id = %owner, %platform, post_id = %draft.id, "listing received");

    send_preview(&bot, chat, &draft, &deps).await?;
    if deps.payment.enabled {
        let instructions = texts::payment_instructions(
            &request.code,
            deps.payment.min_amount,
            deps.payment.jar_url.as_deref(),
        );
        bot.send_message(chat, instructions)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

/// Shows the draft as it will look in the channel, with the request buttons.
async fn send_preview(
    bot: &Bot,
    chat: ChatId,
    draft: &Draft,
    deps: &BotDeps,
) -> Result<(), RequestError> {
    let caption = build_caption(draft, &deps.bot_username);
    let keyboard = keyboards::request_keyboard(deps.payment.free_for_subscribers);

    if let Some(url) = draft.image_url.as_deref().and_then(|u| Url::parse(u).ok()) {
        match bot
            .send_photo(chat, InputFile::url(url))
            .caption(caption.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => debug!(post_id = %draft.id, error = %e, "photo preview failed, sending text"),
        }
    }

    bot.send_message(chat, caption)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, deps: Arc<BotDeps>) -> HandlerResult {
    let owner = OwnerId(ChatId::from(q.from.id).0);
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match action {
        CallbackAction::PublishFree => {
            bot.answer_callback_query(q.id.clone()).await?;
            let reply = publish_free(&bot, &q, owner, &deps).await?;
            if let Some(text) = reply {
                bot.send_message(q.from.id, text).await?;
            }
        }
        CallbackAction::Cancel => {
            bot.answer_callback_query(q.id.clone()).await?;
            let text = match deps.intake.cancel(owner).await {
                Ok(_) => {
                    clear_keyboard(&bot, &q).await;
                    texts::CANCELLED
                }
                Err(e) => {
                    warn!(owner_id = %owner, error = %e, "cancel failed");
                    texts::TRY_LATER
                }
            };
            bot.send_message(q.from.id, text).await?;
        }
        CallbackAction::DeletePost(message_id) => {
            let is_admin = deps.is_admin(owner);
            let text = match deps.publication.delete_post(owner, is_admin, message_id).await {
                Ok(outcome) => {
                    info!(owner_id = %owner, message_id = %message_id, ?outcome, "delete requested");
                    texts::deletion_result(&outcome)
                }
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "delete failed");
                    texts::TRY_LATER.to_string()
                }
            };
            bot.answer_callback_query(q.id.clone()).text(text).await?;
        }
    }
    Ok(())
}

/// Runs the free path. Returns the reply to send, if any is still due.
async fn publish_free(
    bot: &Bot,
    q: &CallbackQuery,
    owner: OwnerId,
    deps: &BotDeps,
) -> Result<Option<&'static str>, HandlerError> {
    if !deps.is_admin(owner) {
        if !deps.payment.free_for_subscribers {
            return Ok(Some(texts::FREE_DISABLED));
        }
        match deps.membership.is_subscribed(owner).await {
            Ok(true) => {}
            Ok(false) => {
                bot.send_message(q.from.id, texts::SUBSCRIBE_FIRST)
                    .reply_markup(keyboards::subscribe_prompt(deps.channel_url.as_ref()))
                    .await?;
                return Ok(None);
            }
            Err(e) => {
                warn!(owner_id = %owner, error = %e, "membership check failed");
                return Ok(Some(texts::MEMBERSHIP_UNKNOWN));
            }
        }
    }

    match deps.publication.publish_free(owner).await {
        Ok(outcome) => {
            if outcome.message_id().is_some() {
                clear_keyboard(bot, q).await;
            }
            Ok(Some(texts::publish_result(&outcome)))
        }
        Err(e) => {
            warn!(owner_id = %owner, error = %e, "free publication failed");
            Ok(Some(texts::TRY_LATER))
        }
    }
}

/// Removes the inline buttons from the message a callback came from.
async fn clear_keyboard(bot: &Bot, q: &CallbackQuery) {
    if let Some(message) = &q.message {
        if let Err(e) = bot
            .edit_message_reply_markup(message.chat().id, message.id())
            .await
        {
            debug!(error = %e, "removing request buttons failed");
        }
    }
}
