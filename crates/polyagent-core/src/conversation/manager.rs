use super::message::{Message, Sender};
use super::model::{Conversation, title_from_input};
use super::store::{ACTIVE_CONVERSATION_KEY, CONVERSATIONS_KEY, KeyValueStore};
use crate::error::{PolyError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Which conversation an in-flight turn or payment timeline writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnBinding {
    /// Write into the conversation captured when the work started.
    #[default]
    Captured,
    /// Write into whatever conversation is active when the update lands.
    FollowActive,
}

/// In-memory conversation state guarded by the manager's lock.
#[derive(Debug, Default)]
struct ConversationState {
    /// Most-recent-first list of conversations.
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    /// Messages currently rendered; mirrors the active conversation.
    visible: Vec<Message>,
    /// Millisecond stamp of the last generated id, keeps ids strictly increasing.
    last_id_millis: i64,
}

impl ConversationState {
    fn position(&self, id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn next_id(&mut self, now_millis: i64) -> (String, i64) {
        let millis = now_millis.max(self.last_id_millis + 1);
        self.last_id_millis = millis;
        (format!("conv-{}", millis), now_millis)
    }

    fn create(&mut self) -> Conversation {
        let (id, created_at) = self.next_id(chrono::Utc::now().timestamp_millis());
        let conversation = Conversation::new(id.clone(), created_at);
        self.conversations.insert(0, conversation.clone());
        self.active_id = Some(id);
        self.visible.clear();
        conversation
    }

    /// Re-reads the visible list from the active conversation if `id` is active.
    fn sync_visible(&mut self, id: &str) {
        if self.active_id.as_deref() != Some(id) {
            return;
        }
        if let Some(conversation) = self.conversations.iter().find(|c| c.id == id) {
            self.visible = conversation.messages.clone();
        }
    }

    /// Appends to conversation `id` and returns the new message's index.
    fn append_to(&mut self, id: &str, message: Message) -> Option<usize> {
        let conversation = self.find_mut(id)?;
        if message.sender == Sender::User && conversation.wants_title() {
            if let Some(title) = title_from_input(&message.text) {
                conversation.title = title;
            }
        }
        conversation.messages.push(message);
        let index = conversation.messages.len() - 1;
        self.sync_visible(id);
        Some(index)
    }

    fn mutate_last_agent_in(&mut self, id: &str, text: &str) -> bool {
        let changed = self
            .find_mut(id)
            .map(|c| c.replace_last_agent_text(text))
            .unwrap_or(false);
        if changed {
            self.sync_visible(id);
        }
        changed
    }

    fn mutate_agent_at(&mut self, id: &str, index: usize, text: &str) -> bool {
        let changed = self
            .find_mut(id)
            .map(|c| c.replace_agent_text_at(index, text))
            .unwrap_or(false);
        if changed {
            self.sync_visible(id);
        }
        changed
    }
}

/// Owns the conversation set, the active conversation and the visible list.
///
/// `ConversationManager` is responsible for:
/// - Loading the conversation set once at startup
/// - Creating, selecting and deleting conversations
/// - Appending and streaming-updating messages
/// - Mirroring every mutation to the key/value store (write-through)
///
/// Persistence is best-effort: store failures are logged and swallowed, the
/// in-memory state stays authoritative.
pub struct ConversationManager {
    state: RwLock<ConversationState>,
    store: Arc<dyn KeyValueStore>,
}

impl ConversationManager {
    /// Creates an empty manager backed by `store`. Call [`load_all`](Self::load_all)
    /// to restore persisted conversations.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: RwLock::new(ConversationState::default()),
            store,
        }
    }

    /// Restores the conversation set and active pointer from the store.
    ///
    /// Fails soft: unreadable or corrupt data is treated as "no conversations",
    /// and an active pointer that does not name a stored conversation is dropped.
    pub async fn load_all(&self) {
        let conversations = match self.store.load(CONVERSATIONS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(conversations) => conversations,
                Err(e) => {
                    tracing::warn!(
                        "[ConversationManager] Discarding corrupt conversation data: {}",
                        e
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("[ConversationManager] Failed to read conversations: {}", e);
                Vec::new()
            }
        };

        let active_id = match self.store.load(ACTIVE_CONVERSATION_KEY).await {
            Ok(Some(id)) => {
                let id = id.trim().to_string();
                if conversations.iter().any(|c| c.id == id) {
                    Some(id)
                } else {
                    tracing::debug!(
                        "[ConversationManager] Active pointer '{}' does not match any conversation",
                        id
                    );
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[ConversationManager] Failed to read active pointer: {}", e);
                None
            }
        };

        let mut state = self.state.write().await;
        state.visible = active_id
            .as_deref()
            .and_then(|id| conversations.iter().find(|c| c.id == id))
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        state.conversations = conversations;
        state.active_id = active_id;

        tracing::info!(
            "[ConversationManager] Loaded {} conversation(s), active: {:?}",
            state.conversations.len(),
            state.active_id
        );
    }

    /// Creates a new conversation, prepends it and makes it active.
    pub async fn create(&self) -> Conversation {
        let mut state = self.state.write().await;
        let conversation = state.create();
        tracing::debug!("[ConversationManager] Created conversation {}", conversation.id);
        self.persist(&state).await;
        conversation
    }

    /// Returns the active conversation id, creating a conversation when none is active.
    pub async fn ensure_active(&self) -> String {
        let mut state = self.state.write().await;
        if let Some(id) = state.active_id.clone() {
            return id;
        }
        let conversation = state.create();
        tracing::debug!(
            "[ConversationManager] Lazily created conversation {}",
            conversation.id
        );
        self.persist(&state).await;
        conversation.id
    }

    /// Makes `id` active and loads its messages into the visible list.
    ///
    /// Returns `false` (and changes nothing) if `id` is unknown.
    pub async fn select(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(messages) = state
            .conversations
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.messages.clone())
        else {
            return false;
        };
        state.active_id = Some(id.to_string());
        state.visible = messages;
        self.persist(&state).await;
        true
    }

    /// Deletes a conversation.
    ///
    /// If it was active, the first remaining conversation becomes active, or a
    /// fresh one is created when none remain. The set is persisted right after
    /// the removal regardless of which branch is taken.
    pub async fn delete(&self, id: &str) {
        let mut state = self.state.write().await;
        let was_active = state.active_id.as_deref() == Some(id);

        if let Some(index) = state.position(id) {
            state.conversations.remove(index);
        }

        if was_active {
            match state.conversations.first().cloned() {
                Some(first) => {
                    state.active_id = Some(first.id);
                    state.visible = first.messages;
                }
                None => {
                    state.active_id = None;
                    state.visible.clear();
                }
            }
        }
        self.persist(&state).await;

        if was_active && state.active_id.is_none() {
            let conversation = state.create();
            tracing::debug!(
                "[ConversationManager] Deleted last conversation, created {}",
                conversation.id
            );
            self.persist(&state).await;
        }
    }

    /// Appends to the active conversation, creating one first if none is active.
    ///
    /// Returns the id of the conversation the message landed in.
    pub async fn append_message(&self, message: Message) -> String {
        let mut state = self.state.write().await;
        let id = match state.active_id.clone() {
            Some(id) => id,
            None => state.create().id,
        };
        state.append_to(&id, message);
        self.persist(&state).await;
        id
    }

    /// Appends to a specific conversation. No-op if it no longer exists.
    pub async fn append_message_to(&self, id: &str, message: Message) -> bool {
        self.append_message_at(id, message).await.is_some()
    }

    /// Like [`append_message_to`](Self::append_message_to), returning the
    /// index the message landed at.
    pub async fn append_message_at(&self, id: &str, message: Message) -> Option<usize> {
        let mut state = self.state.write().await;
        let appended = state.append_to(id, message);
        if appended.is_some() {
            self.persist(&state).await;
        } else {
            tracing::warn!(
                "[ConversationManager] Dropping message for missing conversation {}",
                id
            );
        }
        appended
    }

    /// Replaces the last message of the active conversation if it is an agent message.
    pub async fn mutate_last_agent_message(&self, text: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(id) = state.active_id.clone() else {
            return false;
        };
        let changed = state.mutate_last_agent_in(&id, text);
        if changed {
            self.persist(&state).await;
        }
        changed
    }

    /// Replaces the last message of conversation `id` if it is an agent message.
    pub async fn mutate_last_agent_message_in(&self, id: &str, text: &str) -> bool {
        let mut state = self.state.write().await;
        let changed = state.mutate_last_agent_in(id, text);
        if changed {
            self.persist(&state).await;
        }
        changed
    }

    /// Replaces the agent message at `index` of conversation `id`.
    ///
    /// Messages appended after it are left alone.
    pub async fn mutate_agent_message_at(&self, id: &str, index: usize, text: &str) -> bool {
        let mut state = self.state.write().await;
        let changed = state.mutate_agent_at(id, index, text);
        if changed {
            self.persist(&state).await;
        }
        changed
    }

    /// Renames a conversation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the conversation does not exist.
    pub async fn rename(&self, id: &str, title: impl Into<String>) -> Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .find_mut(id)
            .ok_or_else(|| PolyError::not_found("Conversation", id))?;
        conversation.title = title.into();
        self.persist(&state).await;
        Ok(())
    }

    /// Resolves which conversation a piece of in-flight work should write into.
    pub async fn resolve_target(&self, binding: TurnBinding, captured_id: &str) -> Option<String> {
        let state = self.state.read().await;
        match binding {
            TurnBinding::Captured => state.position(captured_id).map(|_| captured_id.to_string()),
            TurnBinding::FollowActive => state.active_id.clone(),
        }
    }

    /// Returns all conversations, most recent first.
    pub async fn list(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        let state = self.state.read().await;
        state.conversations.iter().find(|c| c.id == id).cloned()
    }

    pub async fn active_id(&self) -> Option<String> {
        self.state.read().await.active_id.clone()
    }

    /// Returns the messages currently rendered for the active conversation.
    pub async fn visible_messages(&self) -> Vec<Message> {
        self.state.read().await.visible.clone()
    }

    /// Mirrors the full state to the store. Failures are logged, never raised.
    async fn persist(&self, state: &ConversationState) {
        match serde_json::to_string(&state.conversations) {
            Ok(serialized) => {
                if let Err(e) = self.store.save(CONVERSATIONS_KEY, &serialized).await {
                    tracing::warn!("[ConversationManager] Failed to persist conversations: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("[ConversationManager] Failed to serialize conversations: {}", e);
            }
        }

        let pointer = match state.active_id.as_deref() {
            Some(id) => self.store.save(ACTIVE_CONVERSATION_KEY, id).await,
            None => self.store.remove(ACTIVE_CONVERSATION_KEY).await,
        };
        if let Err(e) = pointer {
            tracing::warn!("[ConversationManager] Failed to persist active pointer: {}", e);
        }
    }
}
