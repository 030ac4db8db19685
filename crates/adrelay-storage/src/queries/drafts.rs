// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft operations.

use adrelay_core::AdrelayError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{draft_from_row, encode_time, Draft, OwnerId, PostId, Publication, DRAFT_COLUMNS};

/// Insert a new draft.
pub async fn save_draft(db: &Database, draft: &Draft) -> Result<(), AdrelayError> {
    let draft = draft.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO drafts (id, owner_id, title, price, description, image_url,
                                     source_url, created_at, channel_message_id, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    draft.id.0,
                    draft.owner.0,
                    draft.title,
                    draft.price,
                    draft.description,
                    draft.image_url,
                    draft.source_url,
                    encode_time(&draft.created_at),
                    draft.publication.map(|p| p.message_id.0),
                    draft.publication.map(|p| encode_time(&p.published_at)),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a draft by id.
pub async fn get_draft(db: &Database, id: &PostId) -> Result<Option<Draft>, AdrelayError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1"),
                params![id],
                draft_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the publication on a draft that has none. Returns whether a row changed.
pub async fn attach_publication(
    db: &Database,
    id: &PostId,
    publication: Publication,
) -> Result<bool, AdrelayError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE drafts SET channel_message_id = ?2, published_at = ?3
                 WHERE id = ?1 AND channel_message_id IS NULL",
                params![
                    id,
                    publication.message_id.0,
                    encode_time(&publication.published_at)
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every unpublished draft of `owner` that no confirmation points at.
///
/// Pending requests for those drafts go with them through the cascade.
pub async fn delete_unpublished_for_owner(db: &Database, owner: OwnerId) -> Result<u64, AdrelayError> {
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM drafts
                 WHERE owner_id = ?1
                   AND channel_message_id IS NULL
                   AND id NOT IN (SELECT post_id FROM confirmed_records)",
                params![owner.0],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete unpublished drafts created before `cutoff` that nothing references.
pub async fn delete_unpublished_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<u64, AdrelayError> {
    let cutoff = encode_time(&cutoff);
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM drafts
                 WHERE channel_message_id IS NULL
                   AND created_at < ?1
                   AND id NOT IN (SELECT post_id FROM pending_requests)
                   AND id NOT IN (SELECT post_id FROM confirmed_records)",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
