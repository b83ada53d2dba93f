//! In-memory session store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use ana_core::error::{AnaError, Result};
use ana_core::types::{ChatMessage, ChatSession, Reminder, Transaction};

use crate::store::SessionStore;

#[derive(Default)]
struct SessionData {
    session: Option<ChatSession>,
    messages: Vec<ChatMessage>,
    transactions: Vec<Transaction>,
    reminders: Vec<Reminder>,
}

/// Session store that keeps everything in a `HashMap` behind a `Mutex`.
///
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<Uuid, SessionData>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SessionData>>> {
        self.sessions
            .lock()
            .map_err(|e| AnaError::Storage(format!("session lock poisoned: {}", e)))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self) -> Result<ChatSession> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            started_at: now,
            last_message_at: now,
            message_count: 0,
        };
        self.lock()?.insert(
            session.id,
            SessionData {
                session: Some(session.clone()),
                ..SessionData::default()
            },
        );
        Ok(session)
    }

    fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>> {
        Ok(self.lock()?.get(&id).and_then(|d| d.session.clone()))
    }

    fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = self
            .lock()?
            .values()
            .filter_map(|d| d.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(sessions)
    }

    fn delete_session(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock()?.remove(&id).is_some())
    }

    fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let mut sessions = self.lock()?;
        let data = sessions
            .get_mut(&message.session_id)
            .ok_or(AnaError::SessionNotFound(message.session_id))?;
        if let Some(ref mut session) = data.session {
            session.last_message_at = message.created_at;
            session.message_count += 1;
        }
        data.messages.push(message.clone());
        Ok(())
    }

    fn messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        Ok(self
            .lock()?
            .get(&session_id)
            .map(|d| d.messages.clone())
            .unwrap_or_default())
    }

    fn record_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut sessions = self.lock()?;
        let data = sessions
            .get_mut(&transaction.session_id)
            .ok_or(AnaError::SessionNotFound(transaction.session_id))?;
        data.transactions.push(transaction.clone());
        Ok(())
    }

    fn transactions(&self, session_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .lock()?
            .get(&session_id)
            .map(|d| d.transactions.clone())
            .unwrap_or_default())
    }

    fn record_reminder(&self, reminder: &Reminder) -> Result<()> {
        let mut sessions = self.lock()?;
        let data = sessions
            .get_mut(&reminder.session_id)
            .ok_or(AnaError::SessionNotFound(reminder.session_id))?;
        data.reminders.push(reminder.clone());
        Ok(())
    }

    fn reminders(&self, session_id: Uuid) -> Result<Vec<Reminder>> {
        Ok(self
            .lock()?
            .get(&session_id)
            .map(|d| d.reminders.clone())
            .unwrap_or_default())
    }
}
