//! Persistent key/value store trait.
//!
//! Defines the durable storage contract the conversation manager mirrors its
//! state into.

use crate::error::Result;
use async_trait::async_trait;

/// Key holding the serialized conversation list.
pub const CONVERSATIONS_KEY: &str = "poly-ai-conversations";

/// Key holding the active conversation id.
pub const ACTIVE_CONVERSATION_KEY: &str = "poly-ai-current-conversation";

/// An abstract namespaced key/value text store.
///
/// This trait decouples the conversation manager from the concrete storage
/// mechanism (files on disk, memory, a browser-style local store).
///
/// # Implementation Notes
///
/// There is no transactional guarantee across keys: a crash between two saves
/// may leave the conversation list and the active pointer inconsistent. The
/// manager tolerates this on load.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Loads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Value found
    /// - `Ok(None)`: Nothing stored under the key
    /// - `Err(_)`: Storage could not be read
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the value under `key` (no error if absent).
    async fn remove(&self, key: &str) -> Result<()>;
}
