//! Ana storage crate - session store abstraction and its backends.
//!
//! Chat history, recorded transactions and reminders live behind the
//! [`SessionStore`] trait. Two backends are provided: an in-memory store for
//! tests and ephemeral runs, and a WAL-mode SQLite store with migrations.

pub mod db;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use db::Database;
pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::SessionStore;
