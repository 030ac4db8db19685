// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply and inline keyboards.

use adrelay_core::ChannelMessageId;
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::callbacks::CallbackAction;

/// Main-menu button that starts a publication.
pub const PUBLISH_BUTTON: &str = "📤 Опублікувати оголошення";
/// Main-menu button that links to the channel.
pub const CHANNEL_BUTTON: &str = "📢 Перейти на канал";

pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(PUBLISH_BUTTON)],
        vec![KeyboardButton::new(CHANNEL_BUTTON)],
    ])
    .resize_keyboard()
}

/// Buttons under a listing preview.
pub fn request_keyboard(free_publish: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::with_capacity(2);
    if free_publish {
        rows.push(vec![InlineKeyboardButton::callback(
            "🆓 Опублікувати безкоштовно (для підписників)",
            CallbackAction::PublishFree.data(),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Скасувати",
        CallbackAction::Cancel.data(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Shown to non-subscribers who tried the free path.
pub fn subscribe_prompt(channel_url: Option<&Url>) -> InlineKeyboardMarkup {
    let mut rows = Vec::with_capacity(2);
    if let Some(url) = channel_url {
        rows.push(vec![InlineKeyboardButton::url(
            "🔔 Підписатися на канал",
            url.clone(),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "✅ Перевірити підписку",
        CallbackAction::PublishFree.data(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub fn channel_link(channel_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        "📢 Відкрити канал",
        channel_url.clone(),
    )]])
}

/// Attached to every channel post.
pub fn delete_button(message_id: ChannelMessageId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🗑 Видалити оголошення",
        CallbackAction::DeletePost(message_id).data(),
    )]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn request_keyboard_hides_free_button_when_disabled() {
        assert_eq!(callback_data(&request_keyboard(true)), vec!["publish_free", "cancel"]);
        assert_eq!(callback_data(&request_keyboard(false)), vec!["cancel"]);
    }

    #[test]
    fn subscribe_prompt_links_channel_and_rechecks() {
        let url = Url::parse("https://t.me/market_ua").unwrap();
        let markup = subscribe_prompt(Some(&url));
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(callback_data(&markup), vec!["publish_free"]);

        let without_link = subscribe_prompt(None);
        assert_eq!(without_link.inline_keyboard.len(), 1);
    }

    #[test]
    fn delete_button_carries_message_id() {
        assert_eq!(
            callback_data(&delete_button(ChannelMessageId(77))),
            vec!["delete_post_msg_77"]
        );
    }
}
