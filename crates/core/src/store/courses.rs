//! Course structure rows.

use super::connection::ClientStore;
use crate::Error;
use crate::model::CourseSnapshot;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

impl ClientStore {
    /// Insert or replace a course snapshot wholesale.
    pub async fn save_course(&self, course_id: i64, snapshot: &CourseSnapshot) -> Result<(), Error> {
        let json = serde_json::to_string(snapshot)?;
        let title = snapshot.title.clone();
        let saved_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO courses (id, title, snapshot_json, saved_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        snapshot_json = excluded.snapshot_json,
                        saved_at = excluded.saved_at",
                    params![course_id, title, json, saved_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a stored course snapshot.
    ///
    /// Returns None if the course has never been saved.
    pub async fn get_course(&self, course_id: i64) -> Result<Option<CourseSnapshot>, Error> {
        let json = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let json = conn
                    .query_row(
                        "SELECT snapshot_json FROM courses WHERE id = ?1",
                        params![course_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(json)
            })
            .await
            .map_err(Error::from)?;

        json.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }
}
