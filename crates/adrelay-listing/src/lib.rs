// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning marketplace links into ad data.
//!
//! [`url`] finds a link in free text and tells which marketplace it belongs
//! to; [`opengraph`] fetches the page and reads its OpenGraph metadata.

pub mod opengraph;
pub mod url;

pub use opengraph::OpenGraphParser;
pub use url::{extract_url, Platform};
