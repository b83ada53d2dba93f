//! SQLite-backed session store.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use ana_core::error::{AnaError, Result};
use ana_core::types::{
    ChatMessage, ChatSession, Reminder, ReminderStatus, Role, Transaction, TransactionKind,
};

use crate::db::Database;
use crate::store::SessionStore;

/// Session store persisting to a [`Database`].
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store backed by a fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    fn session_exists(conn: &rusqlite::Connection, id: Uuid) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM sessions WHERE id = ?1",
            rusqlite::params![id.to_string()],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|e| AnaError::Storage(e.to_string()))
    }
}

fn storage_err(e: rusqlite::Error) -> AnaError {
    AnaError::Storage(e.to_string())
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AnaError::Storage(format!("invalid timestamp: {}", ms)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AnaError::Storage(format!("invalid uuid '{}': {}", s, e)))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Result<ChatSession>> {
    let id: String = row.get(0)?;
    let started_at: i64 = row.get(1)?;
    let last_message_at: i64 = row.get(2)?;
    let message_count: i64 = row.get(3)?;
    Ok((|| -> Result<ChatSession> {
        Ok(ChatSession {
            id: parse_uuid(&id)?,
            started_at: millis_to_datetime(started_at)?,
            last_message_at: millis_to_datetime(last_message_at)?,
            message_count: message_count.max(0) as u64,
        })
    })())
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Result<ChatMessage>> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    let content: String = row.get(3)?;
    let created_at: i64 = row.get(4)?;
    Ok((|| -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: parse_uuid(&id)?,
            session_id: parse_uuid(&session_id)?,
            role: Role::parse(&role)
                .ok_or_else(|| AnaError::Storage(format!("invalid role: {}", role)))?,
            content,
            created_at: millis_to_datetime(created_at)?,
        })
    })())
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Result<Transaction>> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(1)?;
    let description: String = row.get(2)?;
    let amount: f64 = row.get(3)?;
    let kind: String = row.get(4)?;
    let category: String = row.get(5)?;
    let date: String = row.get(6)?;
    let created_at: i64 = row.get(7)?;
    Ok((|| -> Result<Transaction> {
        Ok(Transaction {
            id: parse_uuid(&id)?,
            session_id: parse_uuid(&session_id)?,
            description,
            amount,
            kind: TransactionKind::parse(&kind)
                .ok_or_else(|| AnaError::Storage(format!("invalid kind: {}", kind)))?,
            category,
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|e| AnaError::Storage(format!("invalid date '{}': {}", date, e)))?,
            created_at: millis_to_datetime(created_at)?,
        })
    })())
}

fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Result<Reminder>> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(1)?;
    let title: String = row.get(2)?;
    let due_date: String = row.get(3)?;
    let status: String = row.get(4)?;
    let amount: Option<f64> = row.get(5)?;
    let created_at: i64 = row.get(6)?;
    Ok((|| -> Result<Reminder> {
        Ok(Reminder {
            id: parse_uuid(&id)?,
            session_id: parse_uuid(&session_id)?,
            title,
            due_date,
            status: ReminderStatus::parse(&status)
                .ok_or_else(|| AnaError::Storage(format!("invalid status: {}", status)))?,
            amount,
            created_at: millis_to_datetime(created_at)?,
        })
    })())
}

/// Run a query and collect the converted rows.
fn collect_rows<T, F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<Result<T>>,
{
    let mut stmt = conn.prepare(sql).map_err(storage_err)?;
    let rows = stmt.query_map(params, map).map_err(storage_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(storage_err)??);
    }
    Ok(out)
}

impl SessionStore for SqliteSessionStore {
    fn create_session(&self) -> Result<ChatSession> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            started_at: now,
            last_message_at: now,
            message_count: 0,
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, started_at, last_message_at, message_count)
                 VALUES (?1, ?2, ?3, 0)",
                rusqlite::params![
                    session.id.to_string(),
                    now.timestamp_millis(),
                    now.timestamp_millis(),
                ],
            )
            .map_err(|e| AnaError::Storage(format!("Failed to create session: {}", e)))?;
            Ok(())
        })?;
        Ok(session)
    }

    fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, started_at, last_message_at, message_count
                     FROM sessions WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    row_to_session,
                )
                .optional()
                .map_err(storage_err)?;
            result.transpose()
        })
    }

    fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.db.with_conn(|conn| {
            collect_rows(
                conn,
                "SELECT id, started_at, last_message_at, message_count
                 FROM sessions ORDER BY last_message_at DESC",
                [],
                row_to_session,
            )
        })
    }

    fn delete_session(&self, id: Uuid) -> Result<bool> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM sessions WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(|e| AnaError::Storage(format!("Failed to delete session: {}", e)))?;
            Ok(deleted > 0)
        })
    }

    fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.db.with_conn(|conn| {
            if !Self::session_exists(conn, message.session_id)? {
                return Err(AnaError::SessionNotFound(message.session_id));
            }
            // The message row and the session counters move together.
            let tx = conn.unchecked_transaction().map_err(storage_err)?;
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.session_id.to_string(),
                    message.role.as_str(),
                    message.content,
                    message.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| AnaError::Storage(format!("Failed to save message: {}", e)))?;
            tx.execute(
                "UPDATE sessions
                 SET last_message_at = ?2, message_count = message_count + 1
                 WHERE id = ?1",
                rusqlite::params![
                    message.session_id.to_string(),
                    message.created_at.timestamp_millis(),
                ],
            )
            .map_err(storage_err)?;
            tx.commit().map_err(storage_err)
        })
    }

    fn messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        self.db.with_conn(|conn| {
            collect_rows(
                conn,
                "SELECT id, session_id, role, content, created_at
                 FROM messages WHERE session_id = ?1 ORDER BY rowid ASC",
                rusqlite::params![session_id.to_string()],
                row_to_message,
            )
        })
    }

    fn record_transaction(&self, tx: &Transaction) -> Result<()> {
        self.db.with_conn(|conn| {
            if !Self::session_exists(conn, tx.session_id)? {
                return Err(AnaError::SessionNotFound(tx.session_id));
            }
            conn.execute(
                "INSERT INTO transactions (id, session_id, description, amount, kind, category, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    tx.id.to_string(),
                    tx.session_id.to_string(),
                    tx.description,
                    tx.amount,
                    tx.kind.as_str(),
                    tx.category,
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| AnaError::Storage(format!("Failed to save transaction: {}", e)))?;
            Ok(())
        })
    }

    fn transactions(&self, session_id: Uuid) -> Result<Vec<Transaction>> {
        self.db.with_conn(|conn| {
            collect_rows(
                conn,
                "SELECT id, session_id, description, amount, kind, category, date, created_at
                 FROM transactions WHERE session_id = ?1 ORDER BY rowid ASC",
                rusqlite::params![session_id.to_string()],
                row_to_transaction,
            )
        })
    }

    fn record_reminder(&self, reminder: &Reminder) -> Result<()> {
        self.db.with_conn(|conn| {
            if !Self::session_exists(conn, reminder.session_id)? {
                return Err(AnaError::SessionNotFound(reminder.session_id));
            }
            conn.execute(
                "INSERT INTO reminders (id, session_id, title, due_date, status, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    reminder.id.to_string(),
                    reminder.session_id.to_string(),
                    reminder.title,
                    reminder.due_date,
                    reminder.status.as_str(),
                    reminder.amount,
                    reminder.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| AnaError::Storage(format!("Failed to save reminder: {}", e)))?;
            Ok(())
        })
    }

    fn reminders(&self, session_id: Uuid) -> Result<Vec<Reminder>> {
        self.db.with_conn(|conn| {
            collect_rows(
                conn,
                "SELECT id, session_id, title, due_date, status, amount, created_at
                 FROM reminders WHERE session_id = ?1 ORDER BY rowid ASC",
                rusqlite::params![session_id.to_string()],
                row_to_reminder,
            )
        })
    }
}
