//! Conversation domain module.
//!
//! This module contains the conversation model, the key/value store
//! interface it is mirrored into, and the manager that owns the set.
//!
//! # Module Structure
//!
//! - `message`: Message types (`Message`, `Sender`, `RenderKind`)
//! - `model`: Conversation entity (`Conversation`)
//! - `store`: Persistence trait (`KeyValueStore`) and storage keys
//! - `manager`: Conversation lifecycle management (`ConversationManager`)

mod manager;
mod manager_test;
mod message;
mod model;
mod store;

// Re-export public API
pub use manager::{ConversationManager, TurnBinding};
pub use message::{Message, RenderKind, Sender};
pub use model::{Conversation, DEFAULT_TITLE, title_from_input};
pub use store::{ACTIVE_CONVERSATION_KEY, CONVERSATIONS_KEY, KeyValueStore};
