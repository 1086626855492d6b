//! Storage crate: conversation persistence behind the [`ConversationStore`] trait.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – UserRecord, MessageRecord, Admission, WindowPolicy
//! - [`store`] – ConversationStore trait
//! - [`conversation_repo`] – ConversationRepository (SQLite)
//! - [`inmemory`] – InMemoryConversationStore
//! - [`sqlite_pool`] – SqlitePoolManager

mod conversation_repo;
mod error;
mod inmemory;
mod models;
mod sqlite_pool;
mod store;

#[cfg(test)]
mod conversation_repo_test;

pub use conversation_repo::ConversationRepository;
pub use error::StorageError;
pub use inmemory::InMemoryConversationStore;
pub use models::{Admission, MessageRecord, UserRecord, WindowPolicy};
pub use sqlite_pool::SqlitePoolManager;
pub use store::ConversationStore;
