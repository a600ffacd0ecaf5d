use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a wallet or by input validation in front of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet not connected")]
    NotConnected,

    /// The user declined the request in the wallet.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("wallet operation failed: {0}")]
    Failed(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// Outcome of a wallet operation as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum WalletStatus {
    /// Carries the signature or transaction hash.
    Succeeded(String),
    Failed(String),
    Rejected(String),
}

impl From<WalletError> for WalletStatus {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected(reason) => Self::Rejected(reason),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// An externally connected wallet.
///
/// Values are denominated in wei.
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Signs `message`, returning the signature.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;

    /// Sends `value_wei` to `to`, returning the transaction hash.
    async fn send_transaction(&self, to: &str, value_wei: u128) -> Result<String, WalletError>;
}

/// Stand-in used when no wallet is connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedWallet;

#[async_trait]
impl WalletClient for DisconnectedWallet {
    async fn sign_message(&self, _message: &str) -> Result<String, WalletError> {
        Err(WalletError::NotConnected)
    }

    async fn send_transaction(&self, _to: &str, _value_wei: u128) -> Result<String, WalletError> {
        Err(WalletError::NotConnected)
    }
}
