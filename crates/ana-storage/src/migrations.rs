//! Database schema migrations.
//!
//! Applies the initial schema: sessions, messages, transactions, reminders
//! and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use ana_core::error::AnaError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), AnaError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AnaError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AnaError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
///
/// Timestamps are epoch milliseconds; dates are `YYYY-MM-DD` text.
fn apply_v1(conn: &Connection) -> Result<(), AnaError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id               TEXT PRIMARY KEY NOT NULL,
            started_at       INTEGER NOT NULL,
            last_message_at  INTEGER NOT NULL,
            message_count    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
            role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages (session_id);

        CREATE TABLE IF NOT EXISTS transactions (
            id           TEXT PRIMARY KEY NOT NULL,
            session_id   TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
            description  TEXT NOT NULL,
            amount       REAL NOT NULL CHECK (amount > 0),
            kind         TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            category     TEXT NOT NULL,
            date         TEXT NOT NULL,
            created_at   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_session
            ON transactions (session_id);

        CREATE TABLE IF NOT EXISTS reminders (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            due_date    TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'completed')),
            amount      REAL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reminders_session
            ON reminders (session_id);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| AnaError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["sessions", "messages", "transactions", "reminders"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn test_amount_must_be_positive() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO sessions (id, started_at, last_message_at) VALUES ('s', 0, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO transactions (id, session_id, description, amount, kind, category, date, created_at)
             VALUES ('t', 's', 'pão', -5, 'expense', 'Alimentação', '2026-10-16', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
