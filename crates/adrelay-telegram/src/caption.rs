// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML captions for channel posts and previews.
//!
//! Telegram caps photo captions at 1024 characters. The description is the
//! only part that gets shortened; everything else is kept whole.

use adrelay_core::Draft;

/// Maximum caption length accepted by the Bot API.
pub const CAPTION_LIMIT: usize = 1024;

/// Titles longer than this are cut before the description is considered.
const TITLE_LIMIT: usize = 256;

const ELLIPSIS: &str = "...";

/// Escapes the characters that carry meaning in Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        _ => out.push(c),
    }
}

/// Escapes `text`, stopping before the escaped form would exceed `budget`
/// characters. Returns the escaped prefix and whether anything was cut.
fn escape_within(text: &str, budget: usize) -> (String, bool) {
    let mut out = String::new();
    let mut used = 0;
    let mut piece = String::new();
    for c in text.chars() {
        piece.clear();
        push_escaped(&mut piece, c);
        let len = piece.chars().count();
        if used + len > budget {
            return (out, true);
        }
        used += len;
        out.push_str(&piece);
    }
    (out, false)
}

/// Renders the caption a draft is posted with.
pub fn build_caption(draft: &Draft, bot_username: &str) -> String {
    let (title, title_cut) = escape_within(draft.title.trim(), TITLE_LIMIT);
    let title = if title_cut {
        format!("{title}{ELLIPSIS}")
    } else {
        title
    };
    let head = format!("<b>{title}</b>\n{}\n\n", escape_html(draft.price.trim()));
    let tail = format!(
        "\n👉 <a href=\"{}\">Детальніше</a>\n🧾 Розміщено через {}",
        escape_html(&draft.source_url),
        escape_html(bot_username)
    );

    let fixed = head.chars().count() + tail.chars().count();
    let budget = CAPTION_LIMIT
        .saturating_sub(fixed)
        .saturating_sub(ELLIPSIS.len());
    let (mut description, cut) = escape_within(draft.description.trim(), budget);
    if cut {
        description = description.trim_end().to_string();
        description.push_str(ELLIPSIS);
    }

    format!("{head}{description}{tail}")
}
