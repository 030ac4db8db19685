// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per store.

pub mod confirmed;
pub mod drafts;
pub mod pending;
pub mod quota;
