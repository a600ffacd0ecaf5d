//! Payment bridge domain: the fixed stage timeline, order data and the
//! duplicate-action guard.

mod guard;
mod stage;

pub use guard::ActionGuard;
pub use stage::{
    BRIDGE_STABLECOIN, PAYMENT_TIMELINE, PaymentOrder, PaymentPhase, PaymentStage, StageKey,
    StageRenderer,
};
