// SPDX-FileCopyrightText: 2026 Nestchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management: PRAGMA setup, migrations, lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's background thread.
//! Do NOT open additional connections for writes.

use std::path::Path;

use nestchat_core::NestchatError;
use tracing::debug;

/// Convert a tokio-rusqlite error into `NestchatError`.
///
/// Lock contention becomes `Conflict` so callers can retry; everything else
/// is `Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> NestchatError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _)) = &e {
        if matches!(
            failure.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return NestchatError::Conflict {
                message: e.to_string(),
            };
        }
    }
    NestchatError::Storage {
        source: Box::new(e),
    }
}

/// A migrated SQLite database owned by one market.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, NestchatError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| NestchatError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| NestchatError::Storage {
                source: Box::new(e),
            })?;

        let migrated = conn
            .call(move |conn| {
                let journal = if wal_mode { "WAL" } else { "DELETE" };
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;"
                ))?;
                Ok(crate::migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;
        migrated?;

        debug!(path, wal_mode, "database opened and migrated");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), NestchatError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn close(self) -> Result<(), NestchatError> {
        self.conn.close().await.map_err(|e| NestchatError::Storage {
            source: Box::new(e),
        })
    }
}
