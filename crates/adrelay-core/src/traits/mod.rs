// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for stores and external collaborators.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod bank;
pub mod channel;
pub mod listing;
pub mod storage;

pub use adapter::PluginAdapter;
pub use bank::{BankStatementClient, TransactionStream};
pub use channel::{MembershipChecker, Notifier, Publisher};
pub use listing::ListingParser;
pub use storage::{ConfirmedStore, DraftStore, PendingStore, QuotaCounter, StorageAdapter, Store};
