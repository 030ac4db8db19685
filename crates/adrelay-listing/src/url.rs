// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link extraction and marketplace detection.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").expect("valid url regex"));

/// Characters that commonly trail a pasted link without being part of it.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '»', '"', '\''];

/// Supported marketplaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Olx,
    /// Shafa, including crafta.ua links which serve the same listings.
    Shafa,
    KidStaff,
    /// Besplatka and its BON.ua mirror.
    Besplatka,
    Instagram,
}

impl Platform {
    /// Every supported platform, in detection order.
    pub const ALL: [Platform; 5] = [
        Platform::Olx,
        Platform::Shafa,
        Platform::KidStaff,
        Platform::Besplatka,
        Platform::Instagram,
    ];

    /// Detects the marketplace from a URL's host.
    pub fn detect(url: &str) -> Option<Platform> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        if host.split('.').any(|label| label == "olx") {
            return Some(Platform::Olx);
        }
        let on = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));
        if on("shafa.ua") || on("crafta.ua") {
            Some(Platform::Shafa)
        } else if on("kidstaff.com.ua") {
            Some(Platform::KidStaff)
        } else if on("besplatka.ua") || on("bon.ua") {
            Some(Platform::Besplatka)
        } else if on("instagram.com") {
            Some(Platform::Instagram)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Olx => "OLX",
            Platform::Shafa => "Shafa",
            Platform::KidStaff => "KidStaff",
            Platform::Besplatka => "Besplatka (BON.ua)",
            Platform::Instagram => "Instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Finds the first link in `text` and returns it with a scheme.
pub fn extract_url(text: &str) -> Option<String> {
    let found = URL_REGEX.find(text)?.as_str();
    normalize_url(found)
}

/// Trims trailing punctuation and adds `https://` when the scheme is missing.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches(TRAILING_PUNCTUATION);
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Url::parse(&candidate).ok().map(|_| candidate)
}
