// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic listing parser based on OpenGraph metadata.
//!
//! Every supported marketplace publishes `og:title`, `og:description` and
//! `og:image`, which is enough for a channel post. Price comes from
//! `product:price:amount` when present, otherwise from the first amount in
//! hryvnias found on the page.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::debug;

use adrelay_core::{AdData, AdrelayError, ListingParser};

use crate::url::Platform;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Shown when a page has no recognizable price.
pub const NO_PRICE: &str = "Ціна не вказана";
const NO_TITLE: &str = "Без назви";
const NO_DESCRIPTION: &str = "Без опису";

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));

static PRICE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s\u{a0}]*(?:[.,]\d+)?)\s*(?:грн|₴|uah)").expect("valid price regex")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos|nbsp);").expect("valid entity regex")
});

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid space regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*(\n\s*)+").expect("valid blank line regex"));

/// Fetches listing pages and reads their OpenGraph metadata.
#[derive(Debug, Clone)]
pub struct OpenGraphParser {
    client: reqwest::Client,
}

impl OpenGraphParser {
    pub fn new() -> Result<Self, AdrelayError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AdrelayError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AdrelayError::Parse {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Fetches `url` and extracts ad data without checking the marketplace.
    pub async fn parse_page(&self, url: &str) -> Result<AdData, AdrelayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdrelayError::Parse {
                message: format!("could not load the listing: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdrelayError::Parse {
                message: format!("listing page returned {status}"),
            });
        }

        let html = response.text().await.map_err(|e| AdrelayError::Parse {
            message: format!("could not read the listing: {e}"),
        })?;
        debug!(url, bytes = html.len(), "listing page fetched");
        extract_ad(&html, url)
    }
}

#[async_trait]
impl ListingParser for OpenGraphParser {
    async fn parse(&self, url: &str) -> Result<AdData, AdrelayError> {
        let platform = Platform::detect(url).ok_or_else(|| AdrelayError::Parse {
            message: "unsupported marketplace link".into(),
        })?;
        debug!(url, %platform, "parsing listing");
        self.parse_page(url).await
    }
}

/// Extracts ad data from a listing page.
///
/// Fails only when the page carries neither a title nor a description.
pub fn extract_ad(html: &str, source_url: &str) -> Result<AdData, AdrelayError> {
    let meta = collect_meta(html);
    let get = |key: &str| meta.get(key).map(|v| clean_inline(v)).filter(|v| !v.is_empty());

    let title = get("og:title").or_else(|| {
        TITLE_TAG
            .captures(html)
            .map(|c| clean_inline(&c[1]))
            .filter(|v| !v.is_empty())
    });
    let description = get("og:description")
        .or_else(|| get("description"))
        .map(|d| clean_block(&d));

    if title.is_none() && description.is_none() {
        return Err(AdrelayError::Parse {
            message: "the page does not look like a listing".into(),
        });
    }

    let price = get("product:price:amount")
        .map(|amount| format_price(&amount))
        .or_else(|| find_price(title.as_deref().unwrap_or_default()))
        .or_else(|| find_price(html))
        .unwrap_or_else(|| NO_PRICE.to_string());

    let image_url = get("og:image")
        .or_else(|| get("og:image:url"))
        .or_else(|| get("twitter:image"));

    Ok(AdData {
        title: title.unwrap_or_else(|| NO_TITLE.to_string()),
        price,
        description: description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        image_url,
        source_url: source_url.to_string(),
    })
}

/// Maps `property`/`name` to `content` for every meta tag. First one wins.
fn collect_meta(html: &str) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for tag in META_TAG.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(value),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            meta.entry(key).or_insert(content);
        }
    }
    meta
}

fn find_price(text: &str) -> Option<String> {
    PRICE_TEXT.captures(text).map(|c| format_price(&c[1]))
}

fn format_price(amount: &str) -> String {
    let digits: String = amount
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let digits = digits
        .strip_suffix(".00")
        .or_else(|| digits.strip_suffix(",00"))
        .unwrap_or(&digits);
    format!("{digits} грн")
}

/// Decodes entities and collapses all whitespace into single spaces.
fn clean_inline(raw: &str) -> String {
    decode_entities(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decodes entities, collapses runs of spaces and limits blank lines to one.
fn clean_block(raw: &str) -> String {
    let decoded = decode_entities(raw).replace("\r\n", "\n");
    let spaced = INLINE_SPACE.replace_all(&decoded, " ");
    BLANK_LINES.replace_all(&spaced, "\n\n").trim().to_string()
}

fn decode_entities(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |c: &Captures<'_>| {
            let entity = &c[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => " ".to_string(),
                _ => numeric_entity(entity).unwrap_or_else(|| c[0].to_string()),
            }
        })
        .into_owned()
}

fn numeric_entity(entity: &str) -> Option<String> {
    let number = entity.strip_prefix('#')?;
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OLX_PAGE: &str = r#"<!doctype html>
<html><head>
<title>Дитяча коляска - OLX.ua</title>
<meta property="og:title" content="Дитяча коляска Anex &amp; Co">
<meta property="og:description" content="Стан   ідеальний.

Самовивіз, Київ">
<meta property="og:image" content="https://ireland.apollo.olxcdn.com/v1/files/abc/image">
<meta name="twitter:image" content="https://example.com/ignored.jpg">
</head><body><h3>4 500 грн</h3></body></html>"#;

    #[test]
    fn reads_opengraph_fields() {
        let ad = extract_ad(OLX_PAGE, "https://www.olx.ua/d/obyavlenie/x").unwrap();
        assert_eq!(ad.title, "Дитяча коляска Anex & Co");
        assert_eq!(ad.description, "Стан ідеальний.\n\nСамовивіз, Київ");
        assert_eq!(
            ad.image_url.as_deref(),
            Some("https://ireland.apollo.olxcdn.com/v1/files/abc/image")
        );
        assert_eq!(ad.price, "4500 грн");
        assert_eq!(ad.source_url, "https://www.olx.ua/d/obyavlenie/x");
    }

    #[test]
    fn product_price_meta_wins() {
        let html = r#"<meta property="og:title" content="Сукня">
<meta property="product:price:amount" content="750.00">
<p>Доставка 60 грн</p>"#;
        let ad = extract_ad(html, "https://shafa.ua/x").unwrap();
        assert_eq!(ad.price, "750 грн");
    }

    #[test]
    fn falls_back_to_title_tag_and_twitter_image() {
        let html = r#"<title>Велосипед дитячий</title>
<meta name='twitter:image' content='https://kidstaff.com.ua/i.jpg'>"#;
        let ad = extract_ad(html, "https://kidstaff.com.ua/tema-1").unwrap();
        assert_eq!(ad.title, "Велосипед дитячий");
        assert_eq!(ad.image_url.as_deref(), Some("https://kidstaff.com.ua/i.jpg"));
        assert_eq!(ad.price, NO_PRICE);
        assert_eq!(ad.description, NO_DESCRIPTION);
    }

    #[test]
    fn numeric_entities_are_decoded() {
        assert_eq!(decode_entities("&#8470; 5 &#x2014; &quot;ok&quot;"), "№ 5 — \"ok\"");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
    }

    #[test]
    fn empty_page_is_a_parse_error() {
        let err = extract_ad("<html><body>nothing</body></html>", "https://olx.ua/x").unwrap_err();
        assert!(matches!(err, AdrelayError::Parse { .. }));
    }

    #[tokio::test]
    async fn parse_page_fetches_and_extracts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/obyavlenie/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OLX_PAGE))
            .mount(&server)
            .await;

        let parser = OpenGraphParser::new().unwrap();
        let url = format!("{}/d/obyavlenie/x", server.uri());
        let ad = parser.parse_page(&url).await.unwrap();
        assert_eq!(ad.price, "4500 грн");
    }

    #[tokio::test]
    async fn missing_page_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let parser = OpenGraphParser::new().unwrap();
        let err = parser
            .parse_page(&format!("{}/gone", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"), "got: {err}");
    }

    #[tokio::test]
    async fn unsupported_marketplace_is_rejected_before_fetching() {
        let parser = OpenGraphParser::new().unwrap();
        let err = parser.parse("https://example.com/item").await.unwrap_err();
        assert!(matches!(err, AdrelayError::Parse { .. }));
    }
}
