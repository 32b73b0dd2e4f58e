//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Client store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct ClientStore {
    pub(crate) conn: Connection,
}

impl ClientStore {
    /// Open a store at the specified path.
    ///
    /// Creates the file (and its parent directory) if it doesn't exist,
    /// applies performance pragmas, and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Remove everything the client has stored.
    ///
    /// Returns the number of deleted rows across both tables.
    pub async fn clear(&self) -> Result<u64, Error> {
        let deleted = self
            .conn
            .call(|conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let activities = tx.execute("DELETE FROM activities", [])?;
                let courses = tx.execute("DELETE FROM courses", [])?;
                tx.commit()?;
                Ok((activities + courses) as u64)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(deleted, "client store cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = ClientStore::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.sqlite");
        ClientStore::open(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_clear_empty() {
        let store = ClientStore::open_in_memory().await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 0);
    }
}
