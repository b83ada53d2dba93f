//! The session store trait.

use uuid::Uuid;

use ana_core::error::Result;
use ana_core::types::{ChatMessage, ChatSession, Reminder, Transaction};

/// Persistence for chat sessions and what was extracted from them.
///
/// Messages are returned oldest first, in insertion order. Appending to or
/// recording against an unknown session fails with
/// [`AnaError::SessionNotFound`](ana_core::AnaError::SessionNotFound).
pub trait SessionStore: Send + Sync {
    /// Create an empty session.
    fn create_session(&self) -> Result<ChatSession>;

    fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>>;

    /// All sessions, most recently active first.
    fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Delete a session and everything recorded against it.
    ///
    /// Returns `false` if the session did not exist.
    fn delete_session(&self, id: Uuid) -> Result<bool>;

    /// Append a message and bump the session's activity timestamp.
    fn append_message(&self, message: &ChatMessage) -> Result<()>;

    fn messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>>;

    fn record_transaction(&self, transaction: &Transaction) -> Result<()>;

    fn transactions(&self, session_id: Uuid) -> Result<Vec<Transaction>>;

    fn record_reminder(&self, reminder: &Reminder) -> Result<()>;

    fn reminders(&self, session_id: Uuid) -> Result<Vec<Reminder>>;
}
