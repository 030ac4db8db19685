// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmed publication operations.
//!
//! A confirmation is only ever written together with the draft's channel
//! message id, inside one transaction, after the channel accepted the post.

use std::collections::HashSet;

use adrelay_core::{AdrelayError, NewConfirmation};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use crate::database::Database;
use crate::models::{
    confirmed_from_row, encode_time, published_from_row, ChannelMessageId, ConfirmedRecord,
    PublishedPost, CONFIRMED_COLUMNS,
};

/// Mark the draft published, insert the confirmation and drop the consumed
/// pending request, all in one transaction.
///
/// A draft that already carries a message id keeps it, and an existing
/// confirmation for the same post is left as is, so replaying this after a
/// crash is harmless. A paid confirmation dropped that way is logged with
/// its transaction id.
pub async fn record_publication(
    db: &Database,
    confirmation: &NewConfirmation,
) -> Result<(), AdrelayError> {
    let owned = confirmation.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let record = &owned.record;
            let publication = owned.publication;

            tx.execute(
                "UPDATE drafts SET channel_message_id = ?2, published_at = ?3
                 WHERE id = ?1 AND channel_message_id IS NULL",
                params![
                    record.post_id.0,
                    publication.message_id.0,
                    encode_time(&publication.published_at)
                ],
            )?;
            let inserted = tx.execute(
                "INSERT INTO confirmed_records (id, code, owner_id, post_id, requested_at, transaction_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(post_id) DO NOTHING",
                params![
                    record.id,
                    record.code,
                    record.owner.0,
                    record.post_id.0,
                    encode_time(&record.requested_at),
                    record.transaction_id,
                ],
            )?;
            if let Some(pending_id) = &owned.consumed_pending {
                tx.execute(
                    "DELETE FROM pending_requests WHERE id = ?1",
                    params![pending_id],
                )?;
            }
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    let record = &confirmation.record;
    if !inserted {
        if let Some(transaction_id) = &record.transaction_id {
            warn!(
                post_id = %record.post_id,
                transaction_id = %transaction_id,
                "post already confirmed; paid confirmation dropped"
            );
        }
    }
    Ok(())
}

/// Transaction ids already consumed by a confirmation.
pub async fn used_transaction_ids(db: &Database) -> Result<HashSet<String>, AdrelayError> {
    db.connection()
        .call(|conn| -> Result<HashSet<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT transaction_id FROM confirmed_records WHERE transaction_id IS NOT NULL",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Confirmations whose draft has no channel message id.
pub async fn list_unpublished(db: &Database) -> Result<Vec<ConfirmedRecord>, AdrelayError> {
    db.connection()
        .call(|conn| -> Result<Vec<ConfirmedRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONFIRMED_COLUMNS}
                 FROM confirmed_records c JOIN drafts d ON d.id = c.post_id
                 WHERE d.channel_message_id IS NULL
                 ORDER BY c.requested_at ASC"
            ))?;
            let rows = stmt.query_map([], confirmed_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Published posts whose publication time is before `cutoff`, oldest first.
pub async fn list_published_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<PublishedPost>, AdrelayError> {
    let cutoff = encode_time(&cutoff);
    db.connection()
        .call(move |conn| -> Result<Vec<PublishedPost>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONFIRMED_COLUMNS}, d.channel_message_id, d.published_at
                 FROM confirmed_records c JOIN drafts d ON d.id = c.post_id
                 WHERE d.channel_message_id IS NOT NULL AND d.published_at < ?1
                 ORDER BY d.published_at ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], published_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_published_by_message(
    db: &Database,
    message_id: ChannelMessageId,
) -> Result<Option<PublishedPost>, AdrelayError> {
    db.connection()
        .call(move |conn| -> Result<Option<PublishedPost>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {CONFIRMED_COLUMNS}, d.channel_message_id, d.published_at
                     FROM confirmed_records c JOIN drafts d ON d.id = c.post_id
                     WHERE d.channel_message_id = ?1"
                ),
                params![message_id.0],
                published_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a confirmation and every draft pointing at its post or message.
///
/// Returns the number of rows removed. Zero means someone else got there first.
pub async fn remove_publication(db: &Database, post: &PublishedPost) -> Result<u64, AdrelayError> {
    let record_id = post.record.id.clone();
    let post_id = post.record.post_id.0.clone();
    let message_id = post.publication.message_id.0;
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let records = tx.execute(
                "DELETE FROM confirmed_records WHERE id = ?1",
                params![record_id],
            )?;
            let drafts = tx.execute(
                "DELETE FROM drafts WHERE id = ?1 OR channel_message_id = ?2",
                params![post_id, message_id],
            )?;
            tx.commit()?;
            Ok((records + drafts) as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count(db: &Database) -> Result<u64, AdrelayError> {
    db.connection()
        .call(|conn| -> Result<u64, rusqlite::Error> {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM confirmed_records", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Draft, OwnerId, Publication};
    use crate::queries::drafts::{attach_publication, get_draft, save_draft};
    use crate::queries::pending;
    use crate::queries::test_support::{draft, hours_ago, pending as pending_req, setup_db};

    fn confirmation(d: &Draft, msg: i32, published_hours_ago: i64, tx: Option<&str>) -> NewConfirmation {
        NewConfirmation {
            record: ConfirmedRecord {
                id: format!("c-{}", d.id),
                code: tx.map(|_| "ABCDEF".to_string()).unwrap_or_else(|| "FREE".to_string()),
                owner: d.owner,
                post_id: d.id.clone(),
                requested_at: d.created_at,
                transaction_id: tx.map(str::to_string),
            },
            publication: Publication {
                message_id: ChannelMessageId(msg),
                published_at: hours_ago(published_hours_ago),
            },
            consumed_pending: None,
        }
    }

    #[tokio::test]
    async fn record_publication_is_atomic_across_tables() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();
        pending::insert(&db, &pending_req("r1", "ABCDEF", &d, hours_ago(1)))
            .await
            .unwrap();

        let mut c = confirmation(&d, 41, 0, Some("tx-1"));
        c.consumed_pending = Some("r1".to_string());
        record_publication(&db, &c).await.unwrap();

        let stored = get_draft(&db, &d.id).await.unwrap().unwrap();
        assert_eq!(stored.publication.unwrap().message_id, ChannelMessageId(41));
        assert_eq!(pending::count(&db).await.unwrap(), 0);
        assert_eq!(count(&db).await.unwrap(), 1);
        assert!(used_transaction_ids(&db).await.unwrap().contains("tx-1"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_publication_for_missing_draft_writes_nothing() {
        let (db, _dir) = setup_db().await;
        let ghost = draft("ghost", 3, hours_ago(1));
        let result = record_publication(&db, &confirmation(&ghost, 1, 0, None)).await;
        assert!(result.is_err());
        assert_eq!(count(&db).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replaying_a_confirmation_keeps_first_message() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();

        record_publication(&db, &confirmation(&d, 41, 0, None)).await.unwrap();
        record_publication(&db, &confirmation(&d, 99, 0, None)).await.unwrap();

        let stored = get_draft(&db, &d.id).await.unwrap().unwrap();
        assert_eq!(stored.publication.unwrap().message_id, ChannelMessageId(41));
        assert_eq!(count(&db).await.unwrap(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn free_publications_do_not_consume_transactions() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();
        record_publication(&db, &confirmation(&d, 7, 0, None)).await.unwrap();
        assert!(used_transaction_ids(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn paid_confirmation_for_a_confirmed_post_is_dropped() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();
        record_publication(&db, &confirmation(&d, 7, 0, None)).await.unwrap();

        let mut paid = confirmation(&d, 8, 0, Some("tx-late"));
        paid.record.id = "c-paid".to_string();
        record_publication(&db, &paid).await.unwrap();

        assert_eq!(count(&db).await.unwrap(), 1);
        assert!(used_transaction_ids(&db).await.unwrap().is_empty());
        assert!(logs_contain("paid confirmation dropped"));
        assert!(logs_contain("tx-late"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn published_before_filters_by_age() {
        let (db, _dir) = setup_db().await;
        let old = draft("old", 1, hours_ago(50));
        let young = draft("young", 1, hours_ago(12));
        save_draft(&db, &old).await.unwrap();
        save_draft(&db, &young).await.unwrap();
        record_publication(&db, &confirmation(&old, 1, 46, None)).await.unwrap();
        record_publication(&db, &confirmation(&young, 2, 10, None)).await.unwrap();

        let expired = list_published_before(&db, hours_ago(45)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].record.post_id, old.id);
        assert_eq!(expired[0].publication.message_id, ChannelMessageId(1));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unpublished_confirmations_are_listed() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();
        // Insert a bare confirmation the way an older deployment could have left it.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO confirmed_records (id, code, owner_id, post_id, requested_at, transaction_id)
                     VALUES ('c1', 'FREE', 3, 'p1', '2026-01-01T00:00:00.000Z', NULL)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let unpublished = list_unpublished(&db).await.unwrap();
        assert_eq!(unpublished.len(), 1);
        assert_eq!(unpublished[0].owner, OwnerId(3));

        let publication = Publication {
            message_id: ChannelMessageId(8),
            published_at: hours_ago(0),
        };
        attach_publication(&db, &d.id, publication).await.unwrap();
        assert!(list_unpublished(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_publication_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let d = draft("p1", 3, hours_ago(1));
        save_draft(&db, &d).await.unwrap();
        record_publication(&db, &confirmation(&d, 12, 0, Some("tx-9"))).await.unwrap();

        let post = find_published_by_message(&db, ChannelMessageId(12))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remove_publication(&db, &post).await.unwrap(), 2);
        assert_eq!(remove_publication(&db, &post).await.unwrap(), 0);
        assert!(get_draft(&db, &d.id).await.unwrap().is_none());
        assert!(find_published_by_message(&db, ChannelMessageId(12))
            .await
            .unwrap()
            .is_none());
        db.close().await.unwrap();
    }
}
