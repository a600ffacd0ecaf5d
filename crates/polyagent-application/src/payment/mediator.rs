use super::orchestrator::{PaymentBridgeOrchestrator, PaymentTrigger, TriggerOutcome};
use polyagent_core::payment::PaymentOrder;
use std::sync::Arc;

/// Actions a rendered control can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ConfirmPayment,
}

/// Entry point for actions raised by rendered message controls.
///
/// The presentation layer wires this up once and forwards every button
/// press with its action id.
pub struct ActionMediator {
    payments: Arc<PaymentBridgeOrchestrator>,
    order: PaymentOrder,
}

impl ActionMediator {
    pub fn new(payments: Arc<PaymentBridgeOrchestrator>) -> Self {
        Self::with_order(payments, PaymentOrder::course())
    }

    /// Uses `order` for confirm-payment actions.
    pub fn with_order(payments: Arc<PaymentBridgeOrchestrator>, order: PaymentOrder) -> Self {
        Self { payments, order }
    }

    pub async fn handle_action(&self, action_id: &str, kind: ActionKind) -> TriggerOutcome {
        tracing::debug!("[ActionMediator] {:?} from {}", kind, action_id);
        match kind {
            ActionKind::ConfirmPayment => {
                self.payments
                    .trigger(PaymentTrigger::new(self.order.clone()).with_action_id(action_id))
                    .await
            }
        }
    }

    /// Confirms the order as a fresh attempt with a generated action id.
    pub async fn confirm_payment(&self) -> TriggerOutcome {
        tracing::debug!("[ActionMediator] ConfirmPayment without a control");
        self.payments
            .trigger(PaymentTrigger::new(self.order.clone()))
            .await
    }
}
