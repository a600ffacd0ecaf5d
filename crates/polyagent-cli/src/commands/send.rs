//! One-shot message submission.

use anyhow::{Result, bail};
use polyagent_application::SubmitOutcome;
use polyagent_application::dispatcher::TurnOutcome;
use polyagent_application::payment::TriggerOutcome;
use serde_json::json;

use crate::app::AppContext;
use crate::commands::events::print_events;

/// Sends `message` to `agent` in the active conversation and prints the reply.
///
/// A scripted payment keeps the process alive until its last stage lands.
pub async fn send(ctx: AppContext, agent: &str, message: &str, as_json: bool) -> Result<()> {
    let AppContext {
        manager,
        dispatcher,
        mediator,
        events,
        ..
    } = ctx;

    // JSON mode prints a single document at the end instead of streaming events.
    let printer = (!as_json).then(|| tokio::spawn(print_events(events, manager.clone())));

    let outcome = dispatcher.submit(agent, message).await;
    let (conversation_id, settled) = match outcome {
        Ok(SubmitOutcome::Turn(report)) => {
            if let TurnOutcome::Failed(e) = &report.outcome {
                tracing::warn!("[Send] Turn failed: {}", e);
            }
            (report.conversation_id.clone(), report.is_settled())
        }
        Ok(SubmitOutcome::Payment(TriggerOutcome::Started(handle))) => {
            let conversation_id = handle.conversation_id().to_string();
            handle.wait().await;
            (conversation_id, true)
        }
        Ok(SubmitOutcome::Payment(other)) => bail!("payment was not started: {:?}", other),
        Err(e) => bail!(e),
    };

    // Dropping the services closes the event channel so the printer can finish.
    drop(dispatcher);
    drop(mediator);
    if let Some(printer) = printer {
        printer.await?;
    }

    if as_json {
        let conversation = manager.get(&conversation_id).await;
        let reply = conversation
            .as_ref()
            .and_then(|c| c.messages.iter().rev().find(|m| m.is_agent()))
            .map(|m| m.text.clone());
        let value = json!({
            "conversationId": conversation_id,
            "agent": agent,
            "settled": settled,
            "reply": reply,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    if !settled {
        bail!("the {} agent did not answer successfully", agent);
    }
    Ok(())
}
