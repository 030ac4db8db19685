// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample data and raw database seeding for tests.

use chrono::Utc;
use rusqlite::params;

use adrelay_core::{AdData, AdrelayError, ConfirmedRecord, Draft, OwnerId, PostId, Transaction};
use adrelay_storage::models::encode_time;
use adrelay_storage::SqliteStorage;

/// Settlement currency used by the default configuration (UAH).
pub const UAH: u16 = 980;

pub fn sample_ad(title: &str) -> AdData {
    AdData {
        title: title.to_string(),
        price: "1200 грн".into(),
        description: "Used, good condition".into(),
        image_url: Some("https://example.com/photo.jpg".into()),
        source_url: "https://www.olx.ua/d/obyavlenie/sample".into(),
    }
}

pub fn sample_draft(id: &str, owner: i64) -> Draft {
    Draft::from_ad(PostId(id.to_string()), OwnerId(owner), sample_ad(id), Utc::now())
}

/// A transaction in the settlement currency.
pub fn transaction(id: &str, comment: &str, amount: i64) -> Transaction {
    Transaction {
        id: id.to_string(),
        comment: comment.to_string(),
        amount,
        currency: UAH,
    }
}

/// Write a confirmation whose draft has no channel message.
///
/// The store API never produces this state; it stands in for rows left by
/// older deployments so recovery can be exercised.
pub async fn insert_unpublished_confirmation(
    store: &SqliteStorage,
    record: &ConfirmedRecord,
) -> Result<(), AdrelayError> {
    let record = record.clone();
    store
        .database()?
        .connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO confirmed_records (id, code, owner_id, post_id, requested_at, transaction_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.code,
                    record.owner.0,
                    record.post_id.0,
                    encode_time(&record.requested_at),
                    record.transaction_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(adrelay_storage::database::map_tr_err)
}
