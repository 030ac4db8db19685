// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for adrelay.

use thiserror::Error;

/// The primary error type used across all adrelay traits and core operations.
#[derive(Debug, Error)]
pub enum AdrelayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging platform errors that may clear up on their own (network, rate limit).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A collaborator refused the request outright (forbidden, malformed request).
    #[error("rejected: {message}")]
    Rejected { message: String },

    /// Bank statement feed errors.
    #[error("bank error: {message}")]
    Bank {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A listing page could not be turned into ad data.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdrelayError {
    /// Whether retrying on the next cycle is pointless without operator action.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Config(_))
    }
}
