// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable credential directory that lets a connection resume without
//! re-pairing. Only the controller touches it.

use std::io::ErrorKind;
use std::path::PathBuf;

use tiffin_core::TiffinError;

/// Session blob stored under `<session_dir>/session-<client_id>`.
#[derive(Debug, Clone)]
pub struct SessionBlob {
    session_dir: PathBuf,
    client_id: String,
}

impl SessionBlob {
    pub fn new(session_dir: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        Self {
            session_dir: session_dir.into(),
            client_id: client_id.into(),
        }
    }

    /// Directory holding this identity's credentials.
    pub fn path(&self) -> PathBuf {
        self.session_dir.join(format!("session-{}", self.client_id))
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(self.path()).await.unwrap_or(false)
    }

    /// Removes the blob. Returns `false` if there was nothing to delete.
    pub async fn delete(&self) -> Result<bool, TiffinError> {
        match tokio::fs::remove_dir_all(self.path()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TiffinError::Internal(format!(
                "cannot delete session blob {}: {e}",
                self.path().display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn delete_removes_only_own_identity() {
        let dir = tempdir().unwrap();
        let blob = SessionBlob::new(dir.path(), "admin");
        let other = SessionBlob::new(dir.path(), "other");

        std::fs::create_dir_all(blob.path().join("Default")).unwrap();
        std::fs::write(blob.path().join("Default").join("creds"), b"x").unwrap();
        std::fs::create_dir_all(other.path()).unwrap();

        assert!(blob.exists().await);
        assert!(blob.delete().await.unwrap());
        assert!(!blob.exists().await);
        assert!(other.exists().await);
    }

    #[tokio::test]
    async fn deleting_missing_blob_is_not_an_error() {
        let dir = tempdir().unwrap();
        let blob = SessionBlob::new(dir.path(), "admin");
        assert!(!blob.delete().await.unwrap());
    }
}
