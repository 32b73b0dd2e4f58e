//! Client store schema upgrades.
//!
//! The schema version lives in SQLite's `user_version` header field. Each
//! upgrade runs in its own transaction together with the version bump, so a
//! failed step leaves the store at the last good version.

use tokio_rusqlite::{Connection, rusqlite};

use crate::Error;

/// One schema step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Schema steps in version order, starting at 1.
pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "cleaned activity content keyed by fingerprint",
        sql: include_str!("../../migrations/001_activities.sql"),
    },
    Migration {
        version: 2,
        description: "course structure snapshots",
        sql: include_str!("../../migrations/002_courses.sql"),
    },
];

/// Schema version this build writes.
pub(crate) fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<u32, Error> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring `conn` up to the last of `migrations`. Returns the resulting version.
///
/// A store written by a newer build is refused rather than guessed at.
pub(crate) fn apply(conn: &mut rusqlite::Connection, migrations: &[Migration]) -> Result<u32, Error> {
    let mut current = schema_version(conn)?;
    let latest = migrations.last().map_or(0, |m| m.version);
    if current > latest {
        return Err(Error::MigrationFailed(format!(
            "client store schema v{current} is newer than supported v{latest}"
        )));
    }

    for migration in migrations.iter().filter(move |m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            Error::MigrationFailed(format!("v{} ({}): {e}", migration.version, migration.description))
        })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;

        tracing::info!(version = migration.version, description = migration.description, "client store upgraded");
        current = migration.version;
    }

    Ok(current)
}

/// Apply every pending schema step.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let version = conn
        .call(|conn| apply(conn, MIGRATIONS))
        .await
        .map_err(Error::from)?;
    tracing::debug!(version, "client store schema ready");
    Ok(())
}
