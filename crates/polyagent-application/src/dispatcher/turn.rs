//! A single request/response exchange with an agent.

use crate::ui::{UiEvent, UiNotifier};
use async_trait::async_trait;
use polyagent_core::agent::{
    AgentRequest, AgentRouter, AgentTransport, ResponseShape, collect_body, parse_structured_reply,
};
use polyagent_core::conversation::{ConversationManager, Message, TurnBinding};
use polyagent_core::error::{PolyError, Result};
use polyagent_core::stream::{SnapshotSink, StreamDecoder, normalize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Shown in place of the agent reply when a turn fails in a release build.
pub const RELEASE_ERROR_TEXT: &str =
    "<p class='text-red-500 whitespace-pre-wrap'>Sorry, an error occurred. Please try again.</p>";

/// Shown in place of the agent reply when a turn fails in a debug build.
pub const DEBUG_ERROR_TEXT: &str = "<p class='text-red-500 whitespace-pre-wrap'>Sorry, an error occurred. \
     Check that the agent backend is reachable and see the log for details.</p>";

/// The visible error text for the current build profile.
pub fn failure_text() -> &'static str {
    if cfg!(debug_assertions) {
        DEBUG_ERROR_TEXT
    } else {
        RELEASE_ERROR_TEXT
    }
}

/// Lifecycle of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingConversation,
    Sending,
    Receiving,
    Settled,
    Failed,
}

/// Reasons a submission is refused before anything is recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("input is empty")]
    EmptyInput,
    #[error("a turn is already in flight for conversation {0}")]
    Busy(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Final normalized agent text.
    Settled(String),
    /// The error that ended the turn. Only logged, never shown.
    Failed(PolyError),
}

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub conversation_id: String,
    pub agent_id: String,
    pub outcome: TurnOutcome,
}

impl TurnReport {
    pub fn phase(&self) -> TurnPhase {
        match self.outcome {
            TurnOutcome::Settled(_) => TurnPhase::Settled,
            TurnOutcome::Failed(_) => TurnPhase::Failed,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Settled(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Settled(text) => Some(text),
            TurnOutcome::Failed(_) => None,
        }
    }
}

/// Runs agent turns and tracks which conversations have one in flight.
///
/// At most one turn is in flight per conversation. While it is, the
/// conversation shows a typing indicator.
pub struct TurnRunner {
    manager: Arc<ConversationManager>,
    router: AgentRouter,
    transport: Arc<dyn AgentTransport>,
    notifier: UiNotifier,
    binding: TurnBinding,
    in_flight: Mutex<HashMap<String, TurnPhase>>,
}

impl TurnRunner {
    pub fn new(
        manager: Arc<ConversationManager>,
        router: AgentRouter,
        transport: Arc<dyn AgentTransport>,
        notifier: UiNotifier,
        binding: TurnBinding,
    ) -> Self {
        Self {
            manager,
            router,
            transport,
            notifier,
            binding,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn manager(&self) -> &Arc<ConversationManager> {
        &self.manager
    }

    pub fn router(&self) -> &AgentRouter {
        &self.router
    }

    /// Current phase of the turn in flight for `conversation_id`, or `Idle`.
    pub async fn phase(&self, conversation_id: &str) -> TurnPhase {
        self.in_flight
            .lock()
            .await
            .get(conversation_id)
            .copied()
            .unwrap_or(TurnPhase::Idle)
    }

    pub async fn is_typing(&self, conversation_id: &str) -> bool {
        self.in_flight.lock().await.contains_key(conversation_id)
    }

    /// Sends `text` to `agent_id` on behalf of `conversation_id`.
    ///
    /// Appends the user message and an empty agent placeholder, then fills
    /// the placeholder from the response. Routing, transport and decode
    /// failures overwrite the placeholder with a fixed error text and are
    /// reported in the returned [`TurnReport`].
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Busy` without side effects if a turn is
    /// already in flight for the conversation.
    pub async fn run_turn(
        &self,
        conversation_id: &str,
        agent_id: &str,
        text: &str,
    ) -> std::result::Result<TurnReport, DispatchError> {
        self.begin(conversation_id).await?;

        self.append(conversation_id, Message::user(text)).await;
        let placeholder = self.append_placeholder(conversation_id).await;
        let outcome = match self.exchange(conversation_id, placeholder, agent_id, text).await {
            Ok(rendered) => TurnOutcome::Settled(rendered),
            Err(error) => {
                tracing::warn!(
                    "[Dispatcher] Turn for {} with agent '{}' failed: {}",
                    conversation_id,
                    agent_id,
                    error
                );
                self.replace_agent_text(conversation_id, placeholder, failure_text())
                    .await;
                TurnOutcome::Failed(error)
            }
        };

        let report = TurnReport {
            conversation_id: conversation_id.to_string(),
            agent_id: agent_id.to_string(),
            outcome,
        };
        self.end(conversation_id, report.phase()).await;
        Ok(report)
    }

    /// Appends a message to `conversation_id` outside of a turn.
    pub async fn append(&self, conversation_id: &str, message: Message) {
        if self.manager.append_message_to(conversation_id, message).await {
            self.notifier.message_appended(conversation_id);
        }
    }

    /// Appends the empty agent message a turn streams into and returns its index.
    async fn append_placeholder(&self, conversation_id: &str) -> Option<usize> {
        let index = self
            .manager
            .append_message_at(conversation_id, Message::placeholder())
            .await;
        if index.is_some() {
            self.notifier.message_appended(conversation_id);
        }
        index
    }

    async fn exchange(
        &self,
        conversation_id: &str,
        placeholder: Option<usize>,
        agent_id: &str,
        text: &str,
    ) -> Result<String> {
        let route = self.router.resolve(agent_id)?;
        let body = self
            .transport
            .post(&route.endpoint, &AgentRequest::new(text))
            .await?;
        self.set_phase(conversation_id, TurnPhase::Receiving).await;

        let mut sink = ConversationSink {
            runner: self,
            conversation_id,
            placeholder,
        };
        match route.shape {
            ResponseShape::StructuredJson => {
                let bytes = collect_body(body).await?;
                let rendered = normalize(&parse_structured_reply(&bytes)?);
                sink.publish(&rendered).await;
                Ok(rendered)
            }
            ResponseShape::StreamedText => Ok(StreamDecoder::drive(body, &mut sink).await?),
        }
    }

    async fn begin(&self, conversation_id: &str) -> std::result::Result<(), DispatchError> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(conversation_id) {
                tracing::debug!("[Dispatcher] Rejecting submission, {} is busy", conversation_id);
                return Err(DispatchError::Busy(conversation_id.to_string()));
            }
            in_flight.insert(conversation_id.to_string(), TurnPhase::Sending);
        }
        self.notifier.notify(UiEvent::TypingChanged {
            conversation_id: conversation_id.to_string(),
            typing: true,
        });
        Ok(())
    }

    async fn set_phase(&self, conversation_id: &str, phase: TurnPhase) {
        if let Some(current) = self.in_flight.lock().await.get_mut(conversation_id) {
            *current = phase;
        }
    }

    async fn end(&self, conversation_id: &str, phase: TurnPhase) {
        self.in_flight.lock().await.remove(conversation_id);
        self.notifier.notify(UiEvent::TypingChanged {
            conversation_id: conversation_id.to_string(),
            typing: false,
        });
        tracing::debug!("[Dispatcher] Turn for {} ended: {:?}", conversation_id, phase);
    }

    /// Replaces the turn's placeholder in the conversation it writes into.
    ///
    /// When the binding moves the write to another conversation there is no
    /// placeholder there, so that conversation's last agent message is used.
    async fn replace_agent_text(&self, conversation_id: &str, placeholder: Option<usize>, text: &str) {
        let Some(target) = self
            .manager
            .resolve_target(self.binding, conversation_id)
            .await
        else {
            return;
        };
        let changed = match placeholder {
            Some(index) if target == conversation_id => {
                self.manager.mutate_agent_message_at(&target, index, text).await
            }
            _ => self.manager.mutate_last_agent_message_in(&target, text).await,
        };
        if changed {
            self.notifier.notify(UiEvent::MessageUpdated {
                conversation_id: target,
            });
        }
    }
}

/// Routes decoder snapshots into the turn's placeholder message.
struct ConversationSink<'a> {
    runner: &'a TurnRunner,
    conversation_id: &'a str,
    placeholder: Option<usize>,
}

#[async_trait]
impl SnapshotSink for ConversationSink<'_> {
    async fn publish(&mut self, snapshot: &str) {
        self.runner
            .replace_agent_text(self.conversation_id, self.placeholder, snapshot)
            .await;
    }
}
