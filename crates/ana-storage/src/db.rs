//! SQLite handle behind the session store.
//!
//! One connection holds every chat session, its messages and whatever the
//! assistant extracted from them (transactions and bill reminders). Child
//! rows reference their session with `ON DELETE CASCADE`, so foreign keys
//! are switched on for every connection.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use ana_core::error::AnaError;

use crate::migrations;

/// Shared SQLite connection for sessions, messages, transactions and reminders.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the Ana database file at `path`, creating parent directories
    /// and the schema on first use.
    ///
    /// WAL journaling lets history reads proceed while a reply is being
    /// written.
    pub fn new(path: &Path) -> Result<Self, AnaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AnaError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| AnaError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Fresh schema with nothing on disk, as used by
    /// [`SqliteSessionStore::in_memory`](crate::SqliteSessionStore::in_memory).
    pub fn in_memory() -> Result<Self, AnaError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AnaError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| AnaError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Run `f` against the connection while holding the lock.
    ///
    /// Store operations that touch more than one table open their own
    /// transaction inside `f`.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AnaError>
    where
        F: FnOnce(&Connection) -> Result<T, AnaError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AnaError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_sessions(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                .map_err(|e| AnaError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert_eq!(count_sessions(&db), 0);
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("ana.db");
        let db = Database::new(&path).unwrap();
        assert_eq!(count_sessions(&db), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_message_for_missing_session_rejected_by_schema() {
        let db = Database::in_memory().unwrap();
        let inserted = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, role, content, created_at)
                 VALUES ('m1', 'no-such-session', 'user', 'oi', 0)",
                [],
            )
            .map_err(|e| AnaError::Storage(e.to_string()))
        });
        assert!(inserted.is_err());
    }

    #[test]
    fn test_deleting_session_removes_its_rows() {
        let db = Database::in_memory().unwrap();
        let remaining: i64 = db
            .with_conn(|conn| {
                conn.execute_batch(
                    "INSERT INTO sessions (id, started_at, last_message_at, message_count)
                     VALUES ('s1', 0, 0, 1);
                     INSERT INTO messages (id, session_id, role, content, created_at)
                     VALUES ('m1', 's1', 'user', 'paguei a luz', 0);
                     DELETE FROM sessions WHERE id = 's1';",
                )
                .map_err(|e| AnaError::Storage(e.to_string()))?;
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                    .map_err(|e| AnaError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("ana.db")).unwrap();
        db.with_conn(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .map_err(|e| AnaError::Storage(e.to_string()))?;
            assert_eq!(mode, "wal");
            Ok(())
        })
        .unwrap();
    }
}
