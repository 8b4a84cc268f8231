// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the session and customer store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use tiffin_config::model::StorageConfig;
use tiffin_core::{
    ConnectionRecord, Customer, CustomerStore, Location, SessionStore, TiffinError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// The database is opened by [`SqliteStorage::initialize`]; every trait
/// method fails with a storage error before that.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    pub async fn initialize(&self) -> Result<(), TiffinError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TiffinError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoints the WAL before shutdown. A no-op if never initialized.
    pub async fn close(&self) -> Result<(), TiffinError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    fn db(&self) -> Result<&Database, TiffinError> {
        self.db.get().ok_or_else(|| TiffinError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn load(&self) -> Result<Option<ConnectionRecord>, TiffinError> {
        queries::connection_status::load(self.db()?).await
    }

    async fn save(&self, record: &ConnectionRecord) -> Result<(), TiffinError> {
        queries::connection_status::save(self.db()?, record).await
    }
}

#[async_trait]
impl CustomerStore for SqliteStorage {
    async fn record_contact(
        &self,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Customer, TiffinError> {
        queries::customers::record_contact(self.db()?, phone, name).await
    }

    async fn update_location(&self, phone: &str, location: &Location) -> Result<(), TiffinError> {
        queries::customers::update_location(self.db()?, phone, location).await
    }

    async fn record_order(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
        queries::customers::record_order(self.db()?, phone, at).await
    }

    async fn get(&self, phone: &str) -> Result<Option<Customer>, TiffinError> {
        queries::customers::get(self.db()?, phone).await
    }

    async fn due_for_reorder(
        &self,
        now: DateTime<Utc>,
        notify_gap: chrono::Duration,
        order_gap: chrono::Duration,
    ) -> Result<Vec<Customer>, TiffinError> {
        let candidates = queries::customers::list_ordering(self.db()?).await?;
        Ok(candidates
            .into_iter()
            .filter(|c| c.is_due_for_reorder(now, notify_gap, order_gap))
            .collect())
    }

    async fn mark_notified(&self, phone: &str, at: DateTime<Utc>) -> Result<(), TiffinError> {
        queries::customers::mark_notified(self.db()?, phone, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tiffin_core::ConnectionState;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn calls_fail_before_initialize() {
        let storage = SqliteStorage::new(make_config("/nonexistent/never.db"));
        assert!(SessionStore::load(&storage).await.is_err());
        assert!(storage.close().await.is_ok());
    }

    #[tokio::test]
    async fn record_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("restart.db");
        let path = db_path.to_str().unwrap();

        {
            let storage = SqliteStorage::new(make_config(path));
            storage.initialize().await.unwrap();
            storage
                .save(&ConnectionRecord::new(ConnectionState::Ready))
                .await
                .unwrap();
            storage.close().await.unwrap();
        }

        let storage = SqliteStorage::new(make_config(path));
        storage.initialize().await.unwrap();
        let record = SessionStore::load(&storage).await.unwrap().unwrap();
        assert_eq!(record.status, ConnectionState::Ready);
    }

    #[tokio::test]
    async fn due_for_reorder_applies_selection_rule() {
        let storage = SqliteStorage::from_database(
            make_config(":memory:"),
            Database::open_in_memory().await.unwrap(),
        );
        let now = Utc::now();
        let day = chrono::Duration::hours(24);
        let two_days = chrono::Duration::hours(48);

        // Ordered 3 days ago, never notified: selected.
        storage
            .record_order("919000000010", now - chrono::Duration::days(3))
            .await
            .unwrap();
        // Ordered 1 day ago: too recent.
        storage
            .record_order("919000000011", now - chrono::Duration::days(1))
            .await
            .unwrap();
        // Ordered 3 days ago but notified 12 hours ago.
        storage
            .record_order("919000000012", now - chrono::Duration::days(3))
            .await
            .unwrap();
        storage
            .mark_notified("919000000012", now - chrono::Duration::hours(12))
            .await
            .unwrap();

        let due = storage.due_for_reorder(now, day, two_days).await.unwrap();
        let phones: Vec<_> = due.iter().map(|c| c.phone.as_str()).collect();
        assert_eq!(phones, vec!["919000000010"]);
    }
}
