// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily quota counter.
//!
//! Claims and releases are single conditional statements, so concurrent
//! callers can never push a day's count past the maximum or below zero.

use adrelay_core::AdrelayError;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::encode_day;

/// Increment the day's count if it is below `max`. Returns whether it did.
pub async fn try_claim(db: &Database, day: NaiveDate, max: u32) -> Result<bool, AdrelayError> {
    if max == 0 {
        return Ok(false);
    }
    let day = encode_day(day);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO quota_counters (day, count) VALUES (?1, 1)
                 ON CONFLICT(day) DO UPDATE SET count = count + 1
                 WHERE quota_counters.count < ?2",
                params![day, max],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Give back one claim. Returns `false` when the count was already zero.
pub async fn release(db: &Database, day: NaiveDate) -> Result<bool, AdrelayError> {
    let day = encode_day(day);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE quota_counters SET count = count - 1 WHERE day = ?1 AND count > 0",
                params![day],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn current_count(db: &Database, day: NaiveDate) -> Result<u32, AdrelayError> {
    let day = encode_day(day);
    db.connection()
        .call(move |conn| -> Result<u32, rusqlite::Error> {
            let count: Option<u32> = conn
                .query_row(
                    "SELECT count FROM quota_counters WHERE day = ?1",
                    params![day],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(count.unwrap_or(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
