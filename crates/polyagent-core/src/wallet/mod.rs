//! Wallet contract.
//!
//! The client never holds keys: signing and sending are delegated to an
//! externally connected wallet behind [`WalletClient`].

mod client;
mod units;

pub use client::{DisconnectedWallet, WalletClient, WalletError, WalletStatus};
pub use units::{parse_ether, validate_address};
