// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing replies.

use adrelay_core::DeleteOutcome;
use adrelay_lifecycle::{DeletionOutcome, PublishOutcome, QuotaSnapshot};

use crate::caption::escape_html;

pub const WELCOME: &str = "👋 Привіт! Ласкаво просимо.\n\n\
    Надішли посилання на оголошення з OLX, Shafa, Kidstaff, Besplatka або Instagram, \
    і я підготую допис для нашого каналу.";
pub const SEND_LINK: &str =
    "🔗 Надішли посилання на оголошення з OLX, Shafa, Kidstaff, Besplatka або Instagram.";
pub const UNSUPPORTED_SITE: &str =
    "⚠️ Цей сайт поки не підтримується. Підтримуються OLX, Shafa, Kidstaff, Besplatka та Instagram.";
pub const PARSE_FAILED: &str =
    "⚠️ Не вдалося прочитати оголошення. Перевір посилання і спробуй ще раз.";
pub const TRY_LATER: &str = "⚠️ Щось пішло не так. Спробуй ще раз трохи пізніше.";
pub const CHANNEL_BUTTON_REPLY: &str = "📢 Наш канал з оголошеннями:";
pub const NO_CHANNEL_LINK: &str = "⚠️ Посилання на канал не налаштоване.";

pub const PUBLISHED: &str = "✅ Оголошення опубліковано.";
pub const CANCELLED: &str = "❌ Публікацію скасовано.";
pub const NOTHING_TO_PUBLISH: &str = "⛔ Немає оголошення для публікації.";
pub const LIMIT_REACHED: &str = "❌ Денний ліміт публікацій вичерпано. Спробуй завтра.";
pub const IN_FLIGHT: &str = "⏳ Оголошення вже публікується.";
pub const PUBLISH_FAILED: &str = "⚠️ Не вдалося опублікувати оголошення. Спробуй пізніше.";
pub const SUBSCRIBE_FIRST: &str =
    "Щоб опублікувати оголошення, спочатку підпишіться на наш канал 🙂";
pub const MEMBERSHIP_UNKNOWN: &str = "⚠️ Не вдалося перевірити підписку. Спробуй ще раз.";
pub const FREE_DISABLED: &str = "⛔ Безкоштовна публікація зараз недоступна.";

pub const DELETED: &str = "✅ Оголошення видалено.";
pub const NOT_OWNER: &str = "⛔ Ви можете видалити лише свої оголошення.";
pub const POST_NOT_FOUND: &str = "⚠️ Пост із таким ID не знайдено.";
pub const DELETE_FORBIDDEN: &str =
    "⚠️ Пост старіший за 48 год або немає прав: Telegram не дозволяє боту його видалити.";
pub const DELETE_USAGE: &str = "❌ Вкажи ID повідомлення. Наприклад:\n/delete 123";
pub const UNKNOWN_COMMAND: &str = "⚠️ Невідома команда або недостатньо прав.";

/// Formats minor units as hryvnias, dropping zero kopiyky.
pub fn format_amount(minor: i64) -> String {
    let (whole, cents) = (minor / 100, (minor % 100).abs());
    if cents == 0 {
        format!("{whole} грн")
    } else {
        format!("{whole}.{cents:02} грн")
    }
}

/// How to pay for a request, in HTML.
pub fn payment_instructions(code: &str, min_amount: i64, jar_url: Option<&str>) -> String {
    let amount = format_amount(min_amount);
    let mut text = match jar_url {
        Some(jar) => format!(
            "💳 Щоб опублікувати оголошення, сплати {amount} на банку:\n👉 <a href=\"{}\">Натисни тут</a>\n\n",
            escape_html(jar)
        ),
        None => format!("💳 Щоб опублікувати оголошення, сплати {amount}.\n\n"),
    };
    text.push_str(&format!(
        "📝 У коментарі до платежу введи цей код: <code>{}</code>\n\n\
         ⏱ Після сплати бот автоматично перевірить оплату та опублікує оголошення впродовж 1–5 хвилин.",
        escape_html(code)
    ));
    text
}

pub fn quota_status(snapshot: &QuotaSnapshot) -> String {
    format!(
        "📊 Сьогодні опубліковано {} з {}. Залишилось місць: {}.",
        snapshot.used, snapshot.max, snapshot.remaining
    )
}

/// Reply to the main-menu publish button.
pub fn publish_prompt(snapshot: &QuotaSnapshot) -> String {
    if snapshot.is_exhausted() {
        LIMIT_REACHED.to_string()
    } else {
        format!("{SEND_LINK}\n\n{}", quota_status(snapshot))
    }
}

pub fn publish_result(outcome: &PublishOutcome) -> &'static str {
    match outcome {
        PublishOutcome::Published(_) | PublishOutcome::AlreadyPublished(_) => PUBLISHED,
        PublishOutcome::QuotaExhausted => LIMIT_REACHED,
        PublishOutcome::InFlight => IN_FLIGHT,
        PublishOutcome::NothingToPublish | PublishOutcome::Withdrawn => NOTHING_TO_PUBLISH,
        PublishOutcome::PublishFailed(_) => PUBLISH_FAILED,
    }
}

pub fn deletion_result(outcome: &DeletionOutcome) -> String {
    match outcome {
        DeletionOutcome::Removed | DeletionOutcome::AlreadyCleaned => DELETED.to_string(),
        DeletionOutcome::NotFound => POST_NOT_FOUND.to_string(),
        DeletionOutcome::NotOwner => NOT_OWNER.to_string(),
        DeletionOutcome::Kept(channel) | DeletionOutcome::Untracked(channel) => match channel {
            DeleteOutcome::Deleted | DeleteOutcome::NotFound => DELETED.to_string(),
            DeleteOutcome::Forbidden(_) => DELETE_FORBIDDEN.to_string(),
            DeleteOutcome::Failed(reason) => format!("⛔ Не вдалося видалити пост: {reason}"),
        },
    }
}
