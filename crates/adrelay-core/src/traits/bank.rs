// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bank statement feed.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::AdrelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Transaction;

/// Lazily consumed sequence of statement lines.
pub type TransactionStream = Pin<Box<dyn Stream<Item = Result<Transaction, AdrelayError>> + Send>>;

/// Source of recent incoming transactions.
///
/// Successive calls may return the same transactions; callers dedupe
/// against already-consumed transaction ids.
#[async_trait]
pub trait BankStatementClient: PluginAdapter {
    /// Fetches transactions booked within `lookback` of now.
    async fn fetch_transactions(&self, lookback: Duration)
        -> Result<TransactionStream, AdrelayError>;
}
