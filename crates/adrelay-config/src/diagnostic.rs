// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Every problem found while loading or validating `adrelay.toml` becomes a
//! [`ConfigError`], rendered through miette with the offending line
//! highlighted when the key can be found in one of the loaded files.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Bare environment names kept from older deployments, keyed by dotted path.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("telegram.bot_token", "BOT_TOKEN"),
    ("telegram.bot_username", "BOT_USERNAME"),
    ("telegram.channel", "CHANNEL_USERNAME"),
    ("telegram.admin_chat_id", "ADMIN_CHAT_ID"),
    ("bank.token", "MONOBANK_TOKEN"),
    ("payment.jar_url", "MONO_JAR_URL"),
];

/// One problem with the loaded configuration.
#[deny(missing_docs)]
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key no section accepts.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(adrelay::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The key as written in the file.
        key: String,
        /// Closest valid key, if one is similar enough.
        suggestion: Option<String>,
        /// Keys accepted in the same section, comma separated.
        valid_keys: String,
        /// Location of the key, when a loaded file contains it.
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        /// The file the key was found in.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(adrelay::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the offending key.
        key: String,
        /// What was found instead.
        detail: String,
        /// Type or shape the key requires.
        expected: String,
        /// Location of the value, when a loaded file contains it.
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        /// The file the value was found in.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required key set nowhere.
    #[error("missing required key `{key}`")]
    #[diagnostic(code(adrelay::config::missing_key), help("set `{key}` in adrelay.toml or export {env}"))]
    MissingKey {
        /// Dotted path of the absent key.
        key: String,
        /// Environment variable(s) that can supply the value.
        env: String,
    },

    /// Values that parse but break a rule, such as a zero daily limit.
    #[error("validation error: {message}")]
    #[diagnostic(code(adrelay::config::validation))]
    Validation {
        /// Which rule failed and for what value.
        message: String,
    },

    /// Anything figment reports that has no dedicated variant.
    #[error("configuration error: {0}")]
    #[diagnostic(code(adrelay::config::other))]
    Other(String),
}

impl ConfigError {
    /// A [`ConfigError::MissingKey`] for a dotted key, naming its env overrides.
    pub fn missing(key: &str) -> Self {
        let mut env = format!("ADRELAY_{}", key.replace('.', "_").to_ascii_uppercase());
        if let Some((_, legacy)) = LEGACY_ENV.iter().find(|(k, _)| *k == key) {
            env.push_str(" or ");
            env.push_str(legacy);
        }
        ConfigError::MissingKey {
            key: key.to_string(),
            env,
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// The TOML files that took part in a load, as `(path, contents)` pairs.
struct SourceIndex<'a> {
    files: &'a [(String, String)],
}

impl SourceIndex<'_> {
    /// Locates `field` under the error's section in the file the error came from.
    fn locate(
        &self,
        error: &figment::error::Error,
        field: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some(origin) = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.as_path()),
                _ => None,
            })
        else {
            return (None, None);
        };

        let Some((path, content)) = self.file(origin) else {
            return (None, None);
        };
        let section: Vec<String> = error
            .path
            .iter()
            .take_while(|segment| segment.as_str() != field)
            .cloned()
            .collect();
        match find_key_offset(content, &section, field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        }
    }

    fn file(&self, origin: &Path) -> Option<(&str, &String)> {
        let origin = origin.display().to_string();
        self.files
            .iter()
            .find(|(p, _)| *p == origin)
            .map(|(p, content)| (p.as_str(), content))
    }
}

/// Converts a figment extraction failure into one diagnostic per problem.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let index = SourceIndex {
        files: toml_sources,
    };

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = index.locate(&error, field);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut dotted: Vec<String> = error.path.clone();
                dotted.push(field.to_string());
                ConfigError::missing(&dotted.join("."))
            }
            Kind::InvalidType(actual, expected) => {
                let key = error.path.join(".");
                let leaf = error.path.last().cloned().unwrap_or_default();
                let (span, src) = index.locate(&error, &leaf);
                ConfigError::InvalidType {
                    key,
                    detail: format!("found {actual}"),
                    expected: expected.to_string(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Byte offset of `field` in `content`, searching after the `[section]`
/// header named by the first element of `path` (or from the top when empty).
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && path.first().is_some() {
            // Left the section without finding the key.
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(field) {
            if rest.trim_start().starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    if errors.len() > 1 {
        eprintln!("{} configuration problems found", errors.len());
    }
}
