//! SQLite-backed score store.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::ScoreStore;
use crate::eval::{HistoryEntry, Sample};
use crate::{Error, Result};

/// Highest schema version this build can read and write.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/0001_evals.sql"))];

/// Score store persisted in a single SQLite file.
///
/// Migrations run on open. [`begin`](Self::begin) and
/// [`commit`](Self::commit) wrap a whole run in one transaction; an open
/// transaction is rolled back when the store is dropped.
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    /// Open or create the database at `path` and migrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema is newer
    /// than [`SCHEMA_VERSION`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened history database");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be read.
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedSchema` for databases written by a newer
    /// version, or the SQLite error of a failing migration.
    pub fn migrate(&self) -> Result<()> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            self.conn.execute_batch(sql)?;
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {version}"))?;
            info!(version, "applied history migration");
        }
        Ok(())
    }

    /// Start a transaction covering all following writes.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Commit the open transaction.
    ///
    /// SQLite rolls a transaction back on its own after some failures
    /// (full disk, I/O error, out of memory). Committing then has nothing
    /// to do and returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn commit(&self) -> Result<()> {
        if !self.in_transaction() {
            warn!("no open transaction to commit, it was rolled back");
            return Ok(());
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn count(&self) -> Result<u64> {
        Ok(self
            .conn
            .query_row("select count(*) from evals", [], |row| row.get(0))?)
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let experiment: String = row.get("experiment")?;
        let name: String = row.get("name")?;
        let result_type: String = row.get("type")?;
        let score: f64 = row.get("score")?;
        let group: Option<String> = row.get("group")?;
        let nanos: i64 = row.get("duration")?;
        let created: DateTime<Utc> = row.get("created")?;

        let mut builder = HistoryEntry::builder(experiment, name, result_type, score)
            .sample(Sample::new(
                row.get::<_, String>("input")?,
                row.get::<_, String>("expected")?,
                row.get::<_, String>("output")?,
            ))
            .duration(Duration::from_nanos(u64::try_from(nanos).unwrap_or(0)))
            .created_at(created);
        if let Some(group) = group {
            builder = builder.group(group);
        }
        Ok(builder.build())
    }
}

impl ScoreStore for SqliteScoreStore {
    fn latest_score(&self, name: &str, result_type: &str) -> Result<Option<f64>> {
        Ok(self
            .conn
            .query_row(
                "select score from evals where name = ?1 and type = ?2 order by id desc limit 1",
                params![name, result_type],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn insert(&mut self, entry: &HistoryEntry) -> Result<()> {
        let nanos = i64::try_from(entry.duration().as_nanos()).unwrap_or(i64::MAX);
        self.conn.execute(
            r#"insert into evals (created, experiment, "group", name, input, expected, output, type, score, duration)
               values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                entry.created_at(),
                entry.experiment(),
                entry.group(),
                entry.name(),
                entry.sample().input,
                entry.sample().expected,
                entry.sample().output,
                entry.result_type(),
                entry.score(),
                nanos,
            ],
        )?;
        Ok(())
    }

    fn entries_for(&self, name: &str, result_type: &str) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"select created, experiment, "group", name, input, expected, output, type, score, duration
               from evals where name = ?1 and type = ?2 order by id"#,
        )?;
        let rows = stmt.query_map(params![name, result_type], Self::entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Drop for SqliteScoreStore {
    fn drop(&mut self) {
        if self.in_transaction() {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrates_fresh_database() {
        let store = SqliteScoreStore::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(store.count().unwrap(), 0);
        // Idempotent
        store.migrate().unwrap();
    }

    #[test]
    fn test_rejects_newer_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();

        let err = SqliteScoreStore::from_connection(conn).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedSchema {
                found: 99,
                supported: SCHEMA_VERSION
            }
        ));
    }

    #[test]
    fn test_insert_and_latest() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        assert_eq!(store.latest_score("n", "t").unwrap(), None);

        store
            .insert(&HistoryEntry::builder("2024-01-02", "n", "t", 0.7).build())
            .unwrap();
        store
            .insert(&HistoryEntry::builder("2024-01-01", "n", "t", 0.75).build())
            .unwrap();
        store
            .insert(&HistoryEntry::builder("2024-01-03", "n", "other", 0.1).build())
            .unwrap();

        assert_eq!(store.latest_score("n", "t").unwrap(), Some(0.75));
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_entries_roundtrip_fields() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        let entry = HistoryEntry::builder("exp", "TestEvalPing", "Exact", 0.5)
            .group("smoke")
            .sample(Sample::new("ping", "pong", "plong"))
            .duration(Duration::from_nanos(1209))
            .build();
        store.insert(&entry).unwrap();

        let entries = store.entries_for("TestEvalPing", "Exact").unwrap();
        assert_eq!(entries.len(), 1);
        let got = &entries[0];
        assert_eq!(got.experiment(), "exp");
        assert_eq!(got.group(), Some("smoke"));
        assert_eq!(got.sample(), &Sample::new("ping", "pong", "plong"));
        assert_eq!(got.duration(), Duration::from_nanos(1209));
        assert_eq!(got.created_at().timestamp(), entry.created_at().timestamp());
    }

    #[test]
    fn test_drop_rolls_back_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evals.db");

        {
            let mut store = SqliteScoreStore::open(&path).unwrap();
            store.begin().unwrap();
            store
                .insert(&HistoryEntry::builder("e", "n", "t", 0.5).build())
                .unwrap();
        }
        {
            let mut store = SqliteScoreStore::open(&path).unwrap();
            assert_eq!(store.count().unwrap(), 0);
            store.begin().unwrap();
            store
                .insert(&HistoryEntry::builder("e", "n", "t", 0.5).build())
                .unwrap();
            store.commit().unwrap();
        }

        let store = SqliteScoreStore::open(&path).unwrap();
        assert_eq!(store.latest_score("n", "t").unwrap(), Some(0.5));
    }

    #[test]
    fn test_commit_after_automatic_rollback() {
        let mut store = SqliteScoreStore::open_in_memory().unwrap();
        store.begin().unwrap();
        store
            .insert(&HistoryEntry::builder("e", "n", "t", 0.5).build())
            .unwrap();
        assert!(store.in_transaction());

        // What SQLite does by itself after SQLITE_FULL or SQLITE_IOERR.
        store.conn.execute_batch("ROLLBACK").unwrap();
        assert!(!store.in_transaction());

        store.commit().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
