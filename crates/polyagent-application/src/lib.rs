//! Use cases of the PolyAgent client: chat turns, the payment bridge and
//! wallet operations, plus the UI event bridge they report through.

pub mod dispatcher;
pub mod payment;
pub mod ui;
pub mod wallet_service;

#[cfg(test)]
mod test_support;

pub use dispatcher::{DispatchError, ResponseDispatcher, SubmitOutcome, TurnRunner};
pub use payment::{ActionKind, ActionMediator, PaymentBridgeOrchestrator};
pub use ui::{UiEvent, UiNotifier};
pub use wallet_service::WalletService;
