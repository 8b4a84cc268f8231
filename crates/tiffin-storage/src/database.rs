// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations, and shutdown.
//!
//! All reads and writes go through tokio-rusqlite's single background
//! thread. Do NOT open additional connections for writes.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tiffin_core::TiffinError;
use tracing::debug;

/// Handle to the single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

/// Storage-layer error carried across the tokio-rusqlite boundary.
#[derive(Debug)]
pub(crate) enum CallError {
    Sqlite(rusqlite::Error),
    Migration(TiffinError),
}

impl From<rusqlite::Error> for CallError {
    fn from(e: rusqlite::Error) -> Self {
        CallError::Sqlite(e)
    }
}

/// Converts a tokio-rusqlite error into a [`TiffinError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TiffinError {
    TiffinError::Storage {
        source: Box::new(e),
    }
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, TiffinError> {
        Self::open_with_options(path, true).await
    }

    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, TiffinError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TiffinError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TiffinError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with migrations applied.
    pub async fn open_in_memory() -> Result<Self, TiffinError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| TiffinError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), TiffinError> {
        self.conn
            .call(move |conn| -> Result<(), CallError> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                crate::migrations::run_migrations(conn).map_err(CallError::Migration)
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(CallError::Migration(inner)) => inner,
                tokio_rusqlite::Error::Error(CallError::Sqlite(inner)) => TiffinError::Storage {
                    source: Box::new(inner),
                },
                _ => TiffinError::Storage {
                    source: "database connection closed during setup".into(),
                },
            })
    }

    /// The underlying async connection used by the query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), TiffinError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Timestamp encoding used in every TEXT time column.
pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_ts(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tiffin.db");
        let _db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopen_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiffin.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.checkpoint().await.unwrap();
        drop(db);
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let applied: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |r| {
                    r.get(0)
                })
            })
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert!(encode_ts(a) < encode_ts(b));
        assert_eq!(encode_ts(a), "2026-01-01T00:00:00.000Z");
    }
}
