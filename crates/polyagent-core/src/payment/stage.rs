//! Payment bridge stages and their rendered messages.

use crate::conversation::Message;
use crate::error::{PolyError, Result};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stablecoin the bridge converts through.
pub const BRIDGE_STABLECOIN: &str = "USDC";

/// Identifies one event of the payment bridge timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKey {
    Initiated,
    BridgeTransferDone,
    SettlementDone,
    DeliveryReady,
    DeliveryComplete,
}

impl StageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::BridgeTransferDone => "bridge-transfer-done",
            Self::SettlementDone => "settlement-done",
            Self::DeliveryReady => "delivery-ready",
            Self::DeliveryComplete => "delivery-complete",
        }
    }

    /// Phase the flow is in once this stage has fired.
    pub fn phase_after(&self) -> PaymentPhase {
        match self {
            Self::Initiated => PaymentPhase::AwaitTransferConfirm,
            Self::BridgeTransferDone => PaymentPhase::TransferDone,
            Self::SettlementDone => PaymentPhase::SettlementDone,
            Self::DeliveryReady => PaymentPhase::AwaitDelivery,
            Self::DeliveryComplete => PaymentPhase::DeliveryComplete,
        }
    }

    fn template_name(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated.html",
            Self::BridgeTransferDone => "bridge-transfer-done.html",
            Self::SettlementDone => "settlement-done.html",
            Self::DeliveryReady => "delivery-ready.html",
            Self::DeliveryComplete => "delivery-complete.html",
        }
    }
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a payment bridge flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPhase {
    #[default]
    Idle,
    LinkOpened,
    AwaitTransferConfirm,
    TransferDone,
    SettlementDone,
    AwaitDelivery,
    DeliveryComplete,
}

impl PaymentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DeliveryComplete)
    }
}

/// What is being paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub item: String,
    /// Decimal amount as shown to the user.
    pub amount: String,
    /// Fiat currency code.
    pub currency: String,
}

impl PaymentOrder {
    pub fn new(item: impl Into<String>, amount: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            amount: amount.into(),
            currency: currency.into(),
        }
    }

    /// The built-in course purchase used by the scripted shopping flow.
    pub fn course() -> Self {
        Self::new("Web3 Full-Stack Development Course", "99.00", "USD")
    }
}

/// One scheduled event: fires `offset` after the trigger instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentStage {
    pub key: StageKey,
    pub offset: Duration,
}

/// The fixed timeline, in firing order.
pub const PAYMENT_TIMELINE: [PaymentStage; 5] = [
    PaymentStage {
        key: StageKey::Initiated,
        offset: Duration::from_millis(0),
    },
    PaymentStage {
        key: StageKey::BridgeTransferDone,
        offset: Duration::from_millis(10_000),
    },
    PaymentStage {
        key: StageKey::SettlementDone,
        offset: Duration::from_millis(18_000),
    },
    PaymentStage {
        key: StageKey::DeliveryReady,
        offset: Duration::from_millis(23_000),
    },
    PaymentStage {
        key: StageKey::DeliveryComplete,
        offset: Duration::from_millis(28_000),
    },
];

const TEMPLATES: [(StageKey, &str); 5] = [
    (
        StageKey::Initiated,
        "<p>Payment order <b>{{ reference }}</b> created for {{ item }}: {{ amount }} {{ currency }}.</p>\
         <p>Converting {{ currency }} to {{ stablecoin }} and bridging the funds. This takes a few seconds...</p>",
    ),
    (
        StageKey::BridgeTransferDone,
        "<p>Bridge transfer complete: {{ amount }} {{ currency }} arrived as {{ amount }} {{ stablecoin }}.</p>",
    ),
    (
        StageKey::SettlementDone,
        "<p>Settlement complete: {{ amount }} {{ stablecoin }} paid out to the merchant in {{ currency }}.</p>",
    ),
    (
        StageKey::DeliveryReady,
        "<p>Payment confirmed. Preparing delivery of <b>{{ item }}</b>...</p>",
    ),
    (
        StageKey::DeliveryComplete,
        "<p><b>{{ item }}</b> is ready. Order {{ reference }} is complete, enjoy!</p>",
    ),
];

/// Renders stage messages for an order.
///
/// Values are HTML-escaped; the surrounding markup is trusted.
pub struct StageRenderer {
    env: Environment<'static>,
}

impl StageRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (key, source) in TEMPLATES {
            env.add_template(key.template_name(), source)
                .map_err(|e| PolyError::internal(format!("invalid stage template {}: {}", key, e)))?;
        }
        Ok(Self { env })
    }

    /// Renders the agent message announcing `key`.
    pub fn render(&self, key: StageKey, order: &PaymentOrder, reference: &str) -> Result<Message> {
        let template = self
            .env
            .get_template(key.template_name())
            .map_err(|e| PolyError::internal(format!("missing stage template {}: {}", key, e)))?;
        let text = template
            .render(context! {
                item => &order.item,
                amount => &order.amount,
                currency => &order.currency,
                stablecoin => BRIDGE_STABLECOIN,
                reference => reference,
            })
            .map_err(|e| PolyError::internal(format!("failed to render stage {}: {}", key, e)))?;
        Ok(Message::agent_markup(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{RenderKind, Sender};

    #[test]
    fn test_timeline_offsets_strictly_increase() {
        assert_eq!(PAYMENT_TIMELINE[0].key, StageKey::Initiated);
        assert_eq!(PAYMENT_TIMELINE[0].offset, Duration::ZERO);
        for pair in PAYMENT_TIMELINE.windows(2) {
            assert!(pair[0].offset < pair[1].offset);
        }
        assert_eq!(PAYMENT_TIMELINE[4].offset, Duration::from_secs(28));
    }

    #[test]
    fn test_every_stage_renders_markup() {
        let renderer = StageRenderer::new().unwrap();
        let order = PaymentOrder::course();
        for stage in PAYMENT_TIMELINE {
            let message = renderer.render(stage.key, &order, "act-1").unwrap();
            assert_eq!(message.sender, Sender::Agent);
            assert_eq!(message.render_kind, RenderKind::Markup);
            assert!(!message.text.is_empty());
        }
        let done = renderer
            .render(StageKey::DeliveryComplete, &order, "act-1")
            .unwrap();
        assert!(done.text.contains("is ready"));
    }

    #[test]
    fn test_order_values_are_escaped() {
        let renderer = StageRenderer::new().unwrap();
        let order = PaymentOrder::new("<script>x</script>", "1", "USD");
        let message = renderer.render(StageKey::DeliveryReady, &order, "r").unwrap();
        assert!(!message.text.contains("<script>"));
    }

    #[test]
    fn test_stage_key_wire_names() {
        assert_eq!(
            serde_json::to_string(&StageKey::BridgeTransferDone).unwrap(),
            "\"bridge-transfer-done\""
        );
        assert_eq!(StageKey::DeliveryComplete.phase_after(), PaymentPhase::DeliveryComplete);
    }
}
