//! Chat orchestrator: wires the interpreter to the session store.
//!
//! Owns session lifecycle, message validation and the one-request-per-session
//! rule, and records whatever the interpreter extracts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ana_core::config::{AnaConfig, AssistantConfig};
use ana_core::types::{
    ChatMessage, ChatSession, ExtractedReminder, ExtractedTransaction, LedgerSummary,
    PersonaConfig, Reminder, Role, Transaction,
};
use ana_storage::SessionStore;

use crate::backend::GenerativeBackend;
use crate::credential::CredentialSource;
use crate::error::{ChatError, InterpreterError};
use crate::interpreter::{InterpreterOptions, MessageInterpreter};

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Outcome of one handled message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ExtractedTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ExtractedReminder>,
}

/// Everything recorded against a session, with totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionLedger {
    pub session_id: Uuid,
    pub transactions: Vec<Transaction>,
    pub reminders: Vec<Reminder>,
    pub summary: LedgerSummary,
}

/// Central coordinator for chat sessions.
pub struct ChatOrchestrator {
    interpreter: MessageInterpreter,
    store: Arc<dyn SessionStore>,
    persona: PersonaConfig,
    greeting: String,
    /// Upper bound on one interpreter call. `None` waits indefinitely.
    timeout: Option<Duration>,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl ChatOrchestrator {
    pub fn new(
        interpreter: MessageInterpreter,
        store: Arc<dyn SessionStore>,
        assistant: &AssistantConfig,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            interpreter,
            store,
            persona: assistant.persona(),
            greeting: assistant.greeting_text(),
            timeout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Build an orchestrator from configuration around `backend` and `store`.
    pub fn from_config(
        config: &AnaConfig,
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let interpreter = MessageInterpreter::new(
            backend,
            CredentialSource::from_config(&config.llm),
            InterpreterOptions::from_config(config),
        );
        let timeout = match config.llm.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(interpreter, store, &config.assistant, timeout)
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    /// Start a new session seeded with the greeting.
    pub fn create_session(&self) -> Result<ChatSession, ChatError> {
        let session = self.store.create_session()?;
        self.store
            .append_message(&ChatMessage::new(session.id, Role::Assistant, &self.greeting))?;
        info!(session_id = %session.id, "Chat session started");
        // Re-read so counters include the greeting.
        Ok(self.store.get_session(session.id)?.unwrap_or(session))
    }

    /// Handle an incoming chat message.
    ///
    /// A `None` session starts a new one. The user message is persisted even
    /// when the interpreter reports a configuration error.
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: Option<Uuid>,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        let sid = match session_id {
            Some(id) => {
                self.store
                    .get_session(id)?
                    .ok_or(ChatError::SessionNotFound(id))?
                    .id
            }
            None => self.create_session()?.id,
        };

        let _guard = InFlightGuard::acquire(&self.in_flight, sid)?;

        let history: Vec<_> = self
            .store
            .messages(sid)?
            .iter()
            .map(ChatMessage::to_turn)
            .collect();
        self.store
            .append_message(&ChatMessage::new(sid, Role::User, message))?;

        let call = self.interpreter.interpret(message, &history, &self.persona);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(session_id = %sid, timeout_secs = limit.as_secs(), "Interpreter timed out, using fallback reply");
                    Ok(MessageInterpreter::fallback())
                }
            },
            None => call.await,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(InterpreterError::EmptyMessage) => return Err(ChatError::EmptyMessage),
            Err(e) => {
                warn!(session_id = %sid, error = %e, "Interpreter is not configured");
                return Err(ChatError::Configuration(format!(
                    "{}. Configure the API key and try again.",
                    e
                )));
            }
        };

        self.store
            .append_message(&ChatMessage::new(sid, Role::Assistant, &result.reply))?;
        if let Some(ref extracted) = result.transaction {
            self.store
                .record_transaction(&Transaction::from_extracted(sid, extracted))?;
            debug!(session_id = %sid, amount = extracted.amount, kind = extracted.kind.as_str(), "Transaction recorded");
        }
        if let Some(ref extracted) = result.reminder {
            self.store
                .record_reminder(&Reminder::from_extracted(sid, extracted))?;
            debug!(session_id = %sid, title = %extracted.title, "Reminder recorded");
        }

        Ok(ChatReply {
            session_id: sid,
            reply: result.reply,
            transaction: result.transaction,
            reminder: result.reminder,
        })
    }

    pub fn get_session(&self, session_id: Uuid) -> Result<ChatSession, ChatError> {
        self.store
            .get_session(session_id)?
            .ok_or(ChatError::SessionNotFound(session_id))
    }

    /// All sessions, most recently active first.
    pub fn list_sessions(&self) -> Result<Vec<ChatSession>, ChatError> {
        Ok(self.store.list_sessions()?)
    }

    /// Message history for a session, oldest first.
    pub fn messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_session(session_id)?;
        Ok(self.store.messages(session_id)?)
    }

    /// Transactions and reminders recorded for a session, with totals.
    pub fn ledger(&self, session_id: Uuid) -> Result<SessionLedger, ChatError> {
        self.get_session(session_id)?;
        let transactions = self.store.transactions(session_id)?;
        let reminders = self.store.reminders(session_id)?;
        let summary = LedgerSummary::compute(&transactions, &reminders);
        Ok(SessionLedger {
            session_id,
            transactions,
            reminders,
            summary,
        })
    }

    pub fn delete_session(&self, session_id: Uuid) -> Result<(), ChatError> {
        if self.store.delete_session(session_id)? {
            info!(session_id = %session_id, "Chat session deleted");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id))
        }
    }
}

/// Marks a session as busy until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    session_id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Uuid>>, session_id: Uuid) -> Result<Self, ChatError> {
        let mut busy = set
            .lock()
            .map_err(|e| ChatError::StorageError(format!("in-flight lock poisoned: {}", e)))?;
        if !busy.insert(session_id) {
            return Err(ChatError::SessionBusy(session_id));
        }
        Ok(Self { set, session_id })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.set.lock() {
            busy.remove(&self.session_id);
        }
    }
}
