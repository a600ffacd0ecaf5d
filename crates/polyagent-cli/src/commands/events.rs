//! Prints UI events as they arrive.

use colored::Colorize;
use polyagent_application::UiEvent;
use polyagent_core::conversation::{ConversationManager, Message};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::render::markup_to_terminal;

/// Drains `events` until every sender is gone, echoing agent output.
///
/// Streamed replies are printed once, when typing stops; stage messages
/// appended by the payment bridge are printed as they land.
pub async fn print_events(
    mut events: mpsc::UnboundedReceiver<UiEvent>,
    manager: Arc<ConversationManager>,
) {
    while let Some(event) = events.recv().await {
        match event {
            UiEvent::TypingChanged {
                conversation_id,
                typing: true,
            } => {
                tracing::debug!("[Events] Typing started in {}", conversation_id);
                println!("{}", "agent is typing...".bright_black());
            }
            UiEvent::TypingChanged {
                conversation_id,
                typing: false,
            } => {
                if let Some(message) = last_agent_message(&manager, &conversation_id).await {
                    print_agent_message(&message);
                }
            }
            UiEvent::MessageAppended { conversation_id } => {
                if let Some(message) = last_agent_message(&manager, &conversation_id).await {
                    // Empty text is the placeholder of a turn that just began.
                    if !message.text.is_empty() {
                        print_agent_message(&message);
                    }
                }
            }
            UiEvent::OpenLink { url } => {
                println!("{} {}", "Payment link:".bright_yellow(), url.underline());
            }
            UiEvent::ControlDisabled { action_id } => {
                println!("{}", format!("(action {} confirmed)", action_id).bright_black());
            }
            UiEvent::ControlEnabled { action_id } => {
                println!("{}", format!("(action {} available again)", action_id).bright_black());
            }
            UiEvent::MessageUpdated { .. } | UiEvent::ScrollToBottom => {}
        }
    }
}

async fn last_agent_message(manager: &ConversationManager, conversation_id: &str) -> Option<Message> {
    let conversation = manager.get(conversation_id).await?;
    conversation.messages.last().filter(|m| m.is_agent()).cloned()
}

pub fn print_agent_message(message: &Message) {
    for line in markup_to_terminal(&message.text).lines() {
        println!("{}", line.bright_blue());
    }
    println!();
}
