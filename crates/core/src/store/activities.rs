//! Activity content rows.

use super::connection::ClientStore;
use crate::Error;
use crate::cache::fingerprint;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

impl ClientStore {
    /// Insert or replace the cleaned HTML for a locator.
    pub async fn save_activity(&self, locator: &str, html: &str) -> Result<(), Error> {
        let fingerprint = fingerprint(locator);
        let locator = locator.to_string();
        let html = html.to_string();
        let saved_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO activities (fingerprint, locator, html, saved_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(fingerprint) DO UPDATE SET
                        locator = excluded.locator,
                        html = excluded.html,
                        saved_at = excluded.saved_at",
                    params![fingerprint, locator, html, saved_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the stored HTML for a locator.
    ///
    /// Returns None if the client has never saved it.
    pub async fn get_activity(&self, locator: &str) -> Result<Option<String>, Error> {
        let fingerprint = fingerprint(locator);
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let html = conn
                    .query_row(
                        "SELECT html FROM activities WHERE fingerprint = ?1",
                        params![fingerprint],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(html)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_activity(&self, locator: &str) -> Result<bool, Error> {
        let fingerprint = fingerprint(locator);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM activities WHERE fingerprint = ?1)",
                    params![fingerprint],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn activity_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
