// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `adrelay-core`.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with millisecond
//! precision, so lexicographic order in SQL matches chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub use adrelay_core::types::{
    ChannelMessageId, ConfirmedRecord, Draft, OwnerId, PendingRequest, PostId, Publication,
    PublishedPost,
};

/// Columns selected for a [`Draft`], in [`draft_from_row`] order.
pub(crate) const DRAFT_COLUMNS: &str = "id, owner_id, title, price, description, image_url, \
     source_url, created_at, channel_message_id, published_at";

/// Columns selected for a [`PendingRequest`], in [`pending_from_row`] order.
pub(crate) const PENDING_COLUMNS: &str =
    "id, code, owner_id, post_id, created_at, transaction_id";

/// Columns selected for a [`ConfirmedRecord`], in [`confirmed_from_row`] order.
pub(crate) const CONFIRMED_COLUMNS: &str =
    "c.id, c.code, c.owner_id, c.post_id, c.requested_at, c.transaction_id";

/// Formats a timestamp for storage.
pub fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a UTC calendar day for the quota table.
pub fn encode_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn decode_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_time(idx, &raw)
}

fn publication_at(row: &Row<'_>, msg_idx: usize, at_idx: usize) -> rusqlite::Result<Option<Publication>> {
    let message_id: Option<i32> = row.get(msg_idx)?;
    let published_at: Option<String> = row.get(at_idx)?;
    match (message_id, published_at) {
        (Some(id), Some(raw)) => Ok(Some(Publication {
            message_id: ChannelMessageId(id),
            published_at: decode_time(at_idx, &raw)?,
        })),
        _ => Ok(None),
    }
}

pub(crate) fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<Draft> {
    Ok(Draft {
        id: PostId(row.get(0)?),
        owner: OwnerId(row.get(1)?),
        title: row.get(2)?,
        price: row.get(3)?,
        description: row.get(4)?,
        image_url: row.get(5)?,
        source_url: row.get(6)?,
        created_at: time_at(row, 7)?,
        publication: publication_at(row, 8, 9)?,
    })
}

pub(crate) fn pending_from_row(row: &Row<'_>) -> rusqlite::Result<PendingRequest> {
    Ok(PendingRequest {
        id: row.get(0)?,
        code: row.get(1)?,
        owner: OwnerId(row.get(2)?),
        post_id: PostId(row.get(3)?),
        created_at: time_at(row, 4)?,
        transaction_id: row.get(5)?,
    })
}

pub(crate) fn confirmed_from_row(row: &Row<'_>) -> rusqlite::Result<ConfirmedRecord> {
    Ok(ConfirmedRecord {
        id: row.get(0)?,
        code: row.get(1)?,
        owner: OwnerId(row.get(2)?),
        post_id: PostId(row.get(3)?),
        requested_at: time_at(row, 4)?,
        transaction_id: row.get(5)?,
    })
}

/// Maps `CONFIRMED_COLUMNS, d.channel_message_id, d.published_at`.
pub(crate) fn published_from_row(row: &Row<'_>) -> rusqlite::Result<PublishedPost> {
    let record = confirmed_from_row(row)?;
    let message_id: i32 = row.get(6)?;
    let published_at = time_at(row, 7)?;
    Ok(PublishedPost {
        record,
        publication: Publication {
            message_id: ChannelMessageId(message_id),
            published_at,
        },
    })
}
