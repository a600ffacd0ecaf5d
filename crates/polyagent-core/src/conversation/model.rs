//! Conversation domain model.

use super::message::{Message, Sender};
use serde::{Deserialize, Serialize};

/// Title given to every freshly created conversation.
pub const DEFAULT_TITLE: &str = "new Chat";

/// Maximum number of characters taken from the first user input for a title.
const TITLE_MAX_CHARS: usize = 30;

/// A titled, ordered, persisted sequence of chat messages.
///
/// The serialized field names mirror the browser storage format so an
/// exported conversation list can be loaded unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (`conv-<millis>`)
    pub id: String,
    /// Human-readable label
    pub title: String,
    /// Ordered message history
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Creation time in epoch milliseconds
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl Conversation {
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at,
        }
    }

    /// Returns true while the conversation still carries the default title
    /// and no user message has been recorded.
    pub fn wants_title(&self) -> bool {
        self.title == DEFAULT_TITLE && !self.messages.iter().any(|m| m.sender == Sender::User)
    }

    /// Replaces the text of the last message if it was sent by an agent.
    ///
    /// Returns whether a message was changed.
    pub fn replace_last_agent_text(&mut self, text: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.is_agent() => {
                last.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    /// Replaces the text of the message at `index` if it is an agent message.
    pub fn replace_agent_text_at(&mut self, index: usize, text: &str) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.is_agent() => {
                message.text = text.to_string();
                true
            }
            _ => false,
        }
    }
}

/// Derives a conversation title from the first user input.
pub fn title_from_input(input: &str) -> Option<String> {
    let first_line = input.trim().lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }
    let title: String = first_line.chars().take(TITLE_MAX_CHARS).collect();
    Some(title.trim_end().to_string())
}
