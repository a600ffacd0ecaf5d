//! Response dispatching.
//!
//! Turns user input into agent turns: picks the target conversation, guards
//! against overlapping turns and writes the agent reply back as it arrives.

mod intent;
mod turn;

pub use intent::is_course_purchase;
pub use turn::{
    DEBUG_ERROR_TEXT, DispatchError, RELEASE_ERROR_TEXT, TurnOutcome, TurnPhase, TurnReport,
    TurnRunner, failure_text,
};

use crate::payment::{PaymentBridgeOrchestrator, TriggerOutcome};
use polyagent_core::agent::TRADE_AGENT;
use polyagent_core::conversation::Message;
use polyagent_core::payment::PaymentOrder;
use std::sync::Arc;

/// Result of a successful submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// An agent turn ran to completion (settled or failed).
    Turn(TurnReport),
    /// The input was a scripted payment request; no agent was contacted.
    Payment(TriggerOutcome),
}

/// Accepts user input for the active conversation.
pub struct ResponseDispatcher {
    runner: Arc<TurnRunner>,
    payments: Arc<PaymentBridgeOrchestrator>,
}

impl ResponseDispatcher {
    pub fn new(runner: Arc<TurnRunner>, payments: Arc<PaymentBridgeOrchestrator>) -> Self {
        Self { runner, payments }
    }

    /// Submits `input` to `agent_id` in the active conversation.
    ///
    /// A conversation is created first when none is active. A `trade`
    /// request to buy a course starts the payment bridge directly instead of
    /// calling the agent.
    ///
    /// # Errors
    ///
    /// - `DispatchError::EmptyInput` for empty or whitespace-only input
    /// - `DispatchError::Busy` while a turn is in flight for the conversation
    pub async fn submit(&self, agent_id: &str, input: &str) -> Result<SubmitOutcome, DispatchError> {
        if input.trim().is_empty() {
            return Err(DispatchError::EmptyInput);
        }

        let manager = self.runner.manager();
        let conversation_id = match manager.active_id().await {
            Some(id) => id,
            None => {
                tracing::debug!("[Dispatcher] {:?}", TurnPhase::AwaitingConversation);
                manager.ensure_active().await
            }
        };

        if agent_id == TRADE_AGENT && is_course_purchase(input) {
            if self.runner.is_typing(&conversation_id).await {
                return Err(DispatchError::Busy(conversation_id));
            }
            tracing::info!("[Dispatcher] Course purchase requested in {}", conversation_id);
            self.runner
                .append(&conversation_id, Message::user(input))
                .await;
            let outcome = self
                .payments
                .trigger_scripted(&conversation_id, PaymentOrder::course())
                .await;
            return Ok(SubmitOutcome::Payment(outcome));
        }

        let report = self.runner.run_turn(&conversation_id, agent_id, input).await?;
        Ok(SubmitOutcome::Turn(report))
    }

    pub async fn is_typing(&self, conversation_id: &str) -> bool {
        self.runner.is_typing(conversation_id).await
    }

    pub async fn phase(&self, conversation_id: &str) -> TurnPhase {
        self.runner.phase(conversation_id).await
    }
}
