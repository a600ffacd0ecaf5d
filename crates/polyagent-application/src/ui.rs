//! UI bridge: typed side effects forwarded to the presentation layer.

use serde::Serialize;
use tokio::sync::mpsc;

/// A side effect the presentation layer should apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    MessageAppended { conversation_id: String },
    /// The last agent message of a conversation was replaced.
    MessageUpdated { conversation_id: String },
    TypingChanged { conversation_id: String, typing: bool },
    OpenLink { url: String },
    ControlDisabled { action_id: String },
    ControlEnabled { action_id: String },
    ScrollToBottom,
}

/// Sends [`UiEvent`]s to whoever renders the conversation.
///
/// Sending never blocks; if nobody is listening the event is dropped.
#[derive(Debug, Clone, Default)]
pub struct UiNotifier {
    sender: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl UiNotifier {
    pub fn new(sender: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Creates a notifier together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    /// A notifier that discards every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn notify(&self, event: UiEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    /// Announces a new message followed by a scroll-to-bottom request.
    pub fn message_appended(&self, conversation_id: &str) {
        self.notify(UiEvent::MessageAppended {
            conversation_id: conversation_id.to_string(),
        });
        self.notify(UiEvent::ScrollToBottom);
    }
}
