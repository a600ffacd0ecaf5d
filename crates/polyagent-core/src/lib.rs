//! Domain core of the PolyAgent client.
//!
//! Holds the conversation model and its manager, the stream decoder, agent
//! routing, the payment bridge timeline and the contracts (store, transport,
//! wallet) implemented by the outer crates.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod payment;
pub mod stream;
pub mod wallet;

// Re-export common error type
pub use error::{PolyError, Result};
