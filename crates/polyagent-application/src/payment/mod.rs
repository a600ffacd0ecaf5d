//! Payment bridge use cases.

mod mediator;
mod orchestrator;

pub use mediator::{ActionKind, ActionMediator};
pub use orchestrator::{
    CONFIRM_PAYMENT_MESSAGE, PaymentBridgeOrchestrator, PaymentHandle, PaymentTrigger,
    TriggerOutcome,
};
