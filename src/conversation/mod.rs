//! Session conversation log: bounded, ordered message history with a pinned
//! system prompt, persisted wholesale per session.

pub mod manager;
pub mod store;
pub mod types;

pub use manager::ConversationManager;
pub use store::{SessionStore, StoreError};
pub use types::{Message, Role};
