//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including the sender and how the text should be rendered.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Message typed by the user.
    #[serde(rename = "user")]
    User,
    /// Message produced by a backend agent or the payment bridge.
    #[serde(rename = "ai")]
    Agent,
}

/// How a renderer should treat the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderKind {
    /// Raw text, escaped on display.
    #[default]
    #[serde(rename = "text")]
    Plain,
    /// Markup (HTML fragment) rendered as-is.
    #[serde(rename = "html")]
    Markup,
}

/// A single message in a conversation.
///
/// Agent markup messages are only ever replaced wholesale while streaming;
/// the stream decoder always publishes the full accumulated buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The content of the message.
    pub text: String,
    /// The sender of the message.
    pub sender: Sender,
    /// Rendering hint, stored under `type` for compatibility with the browser mirror.
    #[serde(rename = "type", default)]
    pub render_kind: RenderKind,
}

impl Message {
    /// A plain-text message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            render_kind: RenderKind::Plain,
        }
    }

    /// An agent markup message.
    pub fn agent_markup(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Agent,
            render_kind: RenderKind::Markup,
        }
    }

    /// The empty agent message appended before a response arrives.
    pub fn placeholder() -> Self {
        Self::agent_markup(String::new())
    }

    pub fn is_agent(&self) -> bool {
        self.sender == Sender::Agent
    }
}
