//! Payment bridge orchestration.
//!
//! Drives the fixed timeline of a simulated cross-border payment: a link is
//! created upstream, then stage messages are appended at fixed offsets from
//! the trigger instant.

use crate::dispatcher::{TurnRunner, failure_text};
use crate::ui::{UiEvent, UiNotifier};
use polyagent_core::agent::TRADE_AGENT;
use polyagent_core::config::GuardConfig;
use polyagent_core::conversation::{ConversationManager, Message, TurnBinding};
use polyagent_core::error::Result;
use polyagent_core::payment::{
    ActionGuard, PAYMENT_TIMELINE, PaymentOrder, PaymentPhase, StageRenderer,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Message sent to the trade agent to create the payment link.
pub const CONFIRM_PAYMENT_MESSAGE: &str = "确认执行支付订单";

/// A request to start the payment flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTrigger {
    /// Identifies the triggering control. Generated when absent.
    pub action_id: Option<String>,
    /// Conversation to report into. Defaults to the active one.
    pub conversation_id: Option<String>,
    pub order: PaymentOrder,
}

impl PaymentTrigger {
    pub fn new(order: PaymentOrder) -> Self {
        Self {
            action_id: None,
            conversation_id: None,
            order,
        }
    }

    pub fn with_action_id(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = Some(action_id.into());
        self
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// A running timeline.
#[derive(Debug)]
pub struct PaymentHandle {
    action_id: String,
    conversation_id: String,
    task: JoinHandle<()>,
}

impl PaymentHandle {
    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until every stage has fired.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!("[PaymentBridge] Timeline {} aborted: {}", self.action_id, e);
        }
    }
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Started(PaymentHandle),
    /// The action id was already handled; nothing happened.
    Duplicate,
    /// Link creation failed; no stage fired and the action may be retried.
    UpstreamFailed,
}

impl TriggerOutcome {
    pub fn into_handle(self) -> Option<PaymentHandle> {
        match self {
            Self::Started(handle) => Some(handle),
            Self::Duplicate | Self::UpstreamFailed => None,
        }
    }
}

/// Starts payment bridge timelines, at most once per action id.
pub struct PaymentBridgeOrchestrator {
    runner: Arc<TurnRunner>,
    notifier: UiNotifier,
    binding: TurnBinding,
    guard: Mutex<ActionGuard>,
    renderer: Arc<StageRenderer>,
    phases: Arc<Mutex<HashMap<String, PaymentPhase>>>,
}

impl PaymentBridgeOrchestrator {
    pub fn new(
        runner: Arc<TurnRunner>,
        notifier: UiNotifier,
        binding: TurnBinding,
        guard: &GuardConfig,
    ) -> Result<Self> {
        Ok(Self {
            runner,
            notifier,
            binding,
            guard: Mutex::new(ActionGuard::from_config(guard)),
            renderer: Arc::new(StageRenderer::new()?),
            phases: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Phase of the flow started by `action_id`; `Idle` if none was started.
    pub async fn phase(&self, action_id: &str) -> PaymentPhase {
        self.phases
            .lock()
            .await
            .get(action_id)
            .copied()
            .unwrap_or_default()
    }

    /// Handles a confirm-payment action.
    ///
    /// The action id is claimed before anything else, so repeated triggers
    /// with the same id are silent no-ops. The trade agent is then asked to
    /// create the payment link; if that turn fails, or cannot start because
    /// another turn is in flight, the claim is released and no stage fires.
    pub async fn trigger(&self, trigger: PaymentTrigger) -> TriggerOutcome {
        let started = Instant::now();
        let action_id = trigger
            .action_id
            .unwrap_or_else(|| format!("pay-{}", uuid::Uuid::new_v4()));

        if !self.claim(&action_id).await {
            tracing::debug!("[PaymentBridge] Ignoring duplicate action {}", action_id);
            return TriggerOutcome::Duplicate;
        }

        let conversation_id = match trigger.conversation_id {
            Some(id) => id,
            None => self.runner.manager().ensure_active().await,
        };

        let report = match self
            .runner
            .run_turn(&conversation_id, TRADE_AGENT, CONFIRM_PAYMENT_MESSAGE)
            .await
        {
            Ok(report) if report.is_settled() => report,
            failed => {
                if let Err(e) = failed {
                    // No turn ran, so nothing has reported the failure yet.
                    tracing::warn!("[PaymentBridge] Link creation not attempted: {}", e);
                    self.runner
                        .append(&conversation_id, Message::agent_markup(failure_text()))
                        .await;
                }
                tracing::warn!(
                    "[PaymentBridge] Link creation failed for {}, releasing action",
                    action_id
                );
                self.guard.lock().await.release(&action_id);
                self.notifier.notify(UiEvent::ControlEnabled { action_id });
                return TriggerOutcome::UpstreamFailed;
            }
        };

        let link = report.text().and_then(find_link);
        TriggerOutcome::Started(
            self.start_timeline(action_id, conversation_id, trigger.order, link, started)
                .await,
        )
    }

    /// Starts a timeline without an upstream link request.
    pub async fn trigger_scripted(&self, conversation_id: &str, order: PaymentOrder) -> TriggerOutcome {
        let started = Instant::now();
        let action_id = format!("pay-{}", uuid::Uuid::new_v4());
        if !self.claim(&action_id).await {
            return TriggerOutcome::Duplicate;
        }
        TriggerOutcome::Started(
            self.start_timeline(action_id, conversation_id.to_string(), order, None, started)
                .await,
        )
    }

    /// Claims `action_id` and disables its control on success.
    async fn claim(&self, action_id: &str) -> bool {
        if !self.guard.lock().await.try_claim(action_id) {
            return false;
        }
        self.notifier.notify(UiEvent::ControlDisabled {
            action_id: action_id.to_string(),
        });
        true
    }

    async fn start_timeline(
        &self,
        action_id: String,
        conversation_id: String,
        order: PaymentOrder,
        link: Option<String>,
        started: Instant,
    ) -> PaymentHandle {
        if let Some(url) = link {
            self.notifier.notify(UiEvent::OpenLink { url });
        }
        self.phases
            .lock()
            .await
            .insert(action_id.clone(), PaymentPhase::LinkOpened);

        tracing::info!(
            "[PaymentBridge] Starting timeline {} for {} ({} {})",
            action_id,
            conversation_id,
            order.amount,
            order.currency
        );

        let timeline = Timeline {
            manager: self.runner.manager().clone(),
            notifier: self.notifier.clone(),
            binding: self.binding,
            renderer: self.renderer.clone(),
            phases: self.phases.clone(),
            action_id: action_id.clone(),
            conversation_id: conversation_id.clone(),
            order,
        };
        let task = tokio::spawn(timeline.run(started));

        PaymentHandle {
            action_id,
            conversation_id,
            task,
        }
    }
}

/// Everything a spawned timeline needs.
struct Timeline {
    manager: Arc<ConversationManager>,
    notifier: UiNotifier,
    binding: TurnBinding,
    renderer: Arc<StageRenderer>,
    phases: Arc<Mutex<HashMap<String, PaymentPhase>>>,
    action_id: String,
    conversation_id: String,
    order: PaymentOrder,
}

impl Timeline {
    async fn run(self, started: Instant) {
        for stage in PAYMENT_TIMELINE {
            // A late wake-up fires the stage immediately; order is kept by the loop.
            tokio::time::sleep_until(started + stage.offset).await;

            match self.renderer.render(stage.key, &self.order, &self.action_id) {
                Ok(message) => {
                    match self
                        .manager
                        .resolve_target(self.binding, &self.conversation_id)
                        .await
                    {
                        Some(target) => {
                            if self.manager.append_message_to(&target, message).await {
                                self.notifier.message_appended(&target);
                            }
                        }
                        None => tracing::debug!(
                            "[PaymentBridge] No conversation for stage {} of {}",
                            stage.key,
                            self.action_id
                        ),
                    }
                }
                Err(e) => tracing::error!("[PaymentBridge] {}", e),
            }

            self.phases
                .lock()
                .await
                .insert(self.action_id.clone(), stage.key.phase_after());
            tracing::debug!("[PaymentBridge] {} fired stage {}", self.action_id, stage.key);
        }
    }
}

/// First http(s) URL in an agent reply.
fn find_link(text: &str) -> Option<String> {
    let start = text.find("https://").or_else(|| text.find("http://"))?;
    let link: String = text[start..]
        .chars()
        .take_while(|c| !c.is_whitespace() && !matches!(c, '<' | '>' | '"' | '\'' | ')'))
        .collect();
    Some(link)
}
