// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment side of adrelay.
//!
//! - [`codes`]: generation and normalization of the short codes payers type
//!   into a transfer comment.
//! - [`matcher`]: the pure pairing of pending requests with bank transactions.
//! - [`monobank`]: the bank statement feed.

pub mod codes;
pub mod matcher;
pub mod monobank;

pub use codes::{normalize_code, CodeGenerator, CODE_ALPHABET, MAX_CODE_ATTEMPTS};
pub use matcher::{match_payments, MatchPolicy, PaymentMatch};
pub use monobank::MonobankClient;
