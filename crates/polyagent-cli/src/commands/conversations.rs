//! Conversation listing and inspection, shared by the REPL and subcommands.

use anyhow::{Result, bail};
use colored::Colorize;
use polyagent_core::conversation::{Conversation, ConversationManager, Message, Sender};
use serde_json::json;

use crate::app::AppContext;
use crate::render::markup_to_terminal;

/// Resolves a user reference to a conversation id.
///
/// Accepts either an id or a 1-based position in the `list` output.
pub async fn resolve_reference(manager: &ConversationManager, reference: &str) -> Option<String> {
    let conversations = manager.list().await;
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(conversation) = position.checked_sub(1).and_then(|i| conversations.get(i)) {
            return Some(conversation.id.clone());
        }
    }
    conversations
        .into_iter()
        .find(|c| c.id == reference)
        .map(|c| c.id)
}

pub async fn print_list(manager: &ConversationManager) {
    let conversations = manager.list().await;
    if conversations.is_empty() {
        println!("{}", "No conversations yet.".bright_black());
        return;
    }

    let active = manager.active_id().await;
    for (index, conversation) in conversations.iter().enumerate() {
        let marker = if active.as_deref() == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>2}. {}  {}",
            marker.bright_green(),
            index + 1,
            conversation.title.bold(),
            format!("{} ({} messages)", conversation.id, conversation.messages.len()).bright_black()
        );
    }
}

pub fn print_messages(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", "(empty)".bright_black());
        return;
    }
    for message in messages {
        match message.sender {
            Sender::User => println!("{}", format!("> {}", message.text).green()),
            Sender::Agent => {
                for line in markup_to_terminal(&message.text).lines() {
                    println!("{}", line.bright_blue());
                }
            }
        }
    }
}

fn conversation_json(conversation: &Conversation) -> serde_json::Value {
    json!({
        "id": conversation.id,
        "title": conversation.title,
        "createdAt": conversation.created_at,
        "messages": conversation.messages.len(),
    })
}

/// `polyagent conversations list`
pub async fn list(ctx: &AppContext, as_json: bool) -> Result<()> {
    if as_json {
        let conversations = ctx.manager.list().await;
        let value: Vec<_> = conversations.iter().map(conversation_json).collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_list(&ctx.manager).await;
    }
    Ok(())
}

/// `polyagent conversations show <ref>`
pub async fn show(ctx: &AppContext, reference: &str, as_json: bool) -> Result<()> {
    let Some(id) = resolve_reference(&ctx.manager, reference).await else {
        bail!("no conversation matches '{}'", reference);
    };
    let Some(conversation) = ctx.manager.get(&id).await else {
        bail!("conversation {} disappeared", id);
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
    } else {
        println!("{}", format!("=== {} ===", conversation.title).bright_magenta().bold());
        print_messages(&conversation.messages);
    }
    Ok(())
}

/// `polyagent conversations delete <ref>`
pub async fn delete(ctx: &AppContext, reference: &str) -> Result<()> {
    let Some(id) = resolve_reference(&ctx.manager, reference).await else {
        bail!("no conversation matches '{}'", reference);
    };
    ctx.manager.delete(&id).await;
    println!("{}", format!("Deleted {}", id).bright_green());
    Ok(())
}
