// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for adrelay integration tests.
//!
//! Provides mock collaborators and a harness that wires them to a temp
//! SQLite database, so lifecycle tests run without Telegram or a bank.
//!
//! # Components
//!
//! - [`MockPublisher`] - records posts, scripts publish failures and delete outcomes
//! - [`MockBank`] - serves a scripted statement
//! - [`MockNotifier`] - captures user notifications
//! - [`MockMembership`] - answers subscription checks from a set
//! - [`TestHarness`] - temp database plus every lifecycle service

pub mod fixtures;
pub mod harness;
pub mod mock_bank;
pub mod mock_channel;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_bank::MockBank;
pub use mock_channel::{MockMembership, MockNotifier, MockPublisher};
