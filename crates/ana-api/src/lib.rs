//! Ana API crate - axum HTTP server and route handlers.
//!
//! Exposes the chat orchestrator over JSON: sending messages, listing and
//! deleting sessions, reading history and the per-session ledger.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
