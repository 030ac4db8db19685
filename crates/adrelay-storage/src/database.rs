// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! The [`Database`] handle is the single writer: query modules accept
//! `&Database` and go through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use adrelay_core::AdrelayError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Handle to the adrelay SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, AdrelayError> {
        Self::open_with_options(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    ///
    /// Missing parent directories are created.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, AdrelayError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AdrelayError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| AdrelayError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), AdrelayError> {
            apply_pragmas(conn, wal_mode).map_err(|e| AdrelayError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(flatten_call_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Truncate the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), AdrelayError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), AdrelayError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(|e| AdrelayError::Storage {
            source: Box::new(e),
        })
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, "journal mode set");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Map a tokio-rusqlite error to [`AdrelayError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> AdrelayError {
    AdrelayError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap an [`AdrelayError`] raised inside a `call` closure.
fn flatten_call_err(e: tokio_rusqlite::Error<AdrelayError>) -> AdrelayError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => AdrelayError::Storage {
            source: other.to_string().into(),
        },
    }
}
