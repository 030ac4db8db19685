// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending payment request operations.

use adrelay_core::AdrelayError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{encode_time, pending_from_row, OwnerId, PendingRequest, PENDING_COLUMNS};

/// Insert a request. Returns `false` without writing when the code is taken.
pub async fn insert(db: &Database, request: &PendingRequest) -> Result<bool, AdrelayError> {
    let request = request.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO pending_requests (id, code, owner_id, post_id, created_at, transaction_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(code) DO NOTHING",
                params![
                    request.id,
                    request.code,
                    request.owner.0,
                    request.post_id.0,
                    encode_time(&request.created_at),
                    request.transaction_id,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All requests, oldest first. Ties on timestamp fall back to insertion order.
pub async fn list(db: &Database) -> Result<Vec<PendingRequest>, AdrelayError> {
    db.connection()
        .call(|conn| -> Result<Vec<PendingRequest>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PENDING_COLUMNS} FROM pending_requests ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map([], pending_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recently created request of `owner`.
pub async fn latest_for_owner(
    db: &Database,
    owner: OwnerId,
) -> Result<Option<PendingRequest>, AdrelayError> {
    db.connection()
        .call(move |conn| -> Result<Option<PendingRequest>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {PENDING_COLUMNS} FROM pending_requests
                     WHERE owner_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![owner.0],
                pending_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn delete(db: &Database, id: &str) -> Result<bool, AdrelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute("DELETE FROM pending_requests WHERE id = ?1", params![id])?;
            Ok(removed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Attach the paying transaction to a request.
///
/// Re-marking with the same transaction is a no-op success; a request
/// already paid by a different transaction is left alone.
pub async fn mark_paid(db: &Database, id: &str, transaction_id: &str) -> Result<bool, AdrelayError> {
    let id = id.to_string();
    let transaction_id = transaction_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let updated = conn.execute(
                "UPDATE pending_requests SET transaction_id = ?2
                 WHERE id = ?1 AND (transaction_id IS NULL OR transaction_id = ?2)",
                params![id, transaction_id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete unpaid requests created before `cutoff`.
pub async fn delete_before(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, AdrelayError> {
    let cutoff = encode_time(&cutoff);
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM pending_requests WHERE created_at < ?1 AND transaction_id IS NULL",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count(db: &Database) -> Result<u64, AdrelayError> {
    db.connection()
        .call(|conn| -> Result<u64, rusqlite::Error> {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM pending_requests", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
