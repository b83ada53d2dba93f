//! Conversational core for Ana.
//!
//! Interprets user messages through a generative-language backend, extracting
//! transactions and reminders alongside a chat reply, and coordinates chat
//! sessions on top of a [`SessionStore`](ana_storage::SessionStore).

pub mod backend;
pub mod context;
pub mod credential;
pub mod error;
pub mod interpreter;
pub mod orchestrator;
pub mod prompt;
pub mod schema;

pub use backend::{GeminiBackend, GenerationRequest, GenerativeBackend};
pub use context::HistoryWindow;
pub use credential::CredentialSource;
pub use error::{ChatError, InterpreterError};
pub use interpreter::{InterpreterOptions, MessageInterpreter, FALLBACK_REPLY};
pub use orchestrator::{ChatOrchestrator, ChatReply, SessionLedger};
