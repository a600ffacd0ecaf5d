//! Wallet operations with input validation in front of the wallet.

use polyagent_core::wallet::{WalletClient, WalletError, WalletStatus, parse_ether, validate_address};
use std::sync::Arc;

pub struct WalletService {
    wallet: Arc<dyn WalletClient>,
}

impl WalletService {
    pub fn new(wallet: Arc<dyn WalletClient>) -> Self {
        Self { wallet }
    }

    /// Signs `message` with the connected wallet.
    pub async fn sign_message(&self, message: &str) -> WalletStatus {
        if message.trim().is_empty() {
            return WalletStatus::Failed("Please enter a message to sign".to_string());
        }
        let result = self.wallet.sign_message(message).await;
        Self::report("sign_message", result)
    }

    /// Sends `amount` ether to `to` with the connected wallet.
    pub async fn send_transfer(&self, to: &str, amount: &str) -> WalletStatus {
        let to = to.trim();
        if to.is_empty() || amount.trim().is_empty() {
            return WalletStatus::Failed("Please fill in recipient address and amount".to_string());
        }
        let value_wei = match validate_address(to).and_then(|_| parse_ether(amount)) {
            Ok(value) => value,
            Err(e) => return e.into(),
        };
        let result = self.wallet.send_transaction(to, value_wei).await;
        Self::report("send_transaction", result)
    }

    fn report(operation: &str, result: Result<String, WalletError>) -> WalletStatus {
        match result {
            Ok(output) => {
                tracing::info!("[WalletService] {} succeeded", operation);
                WalletStatus::Succeeded(output)
            }
            Err(e) => {
                tracing::warn!("[WalletService] {} failed: {}", operation, e);
                e.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use polyagent_core::wallet::DisconnectedWallet;
    use std::sync::Mutex;

    const RECIPIENT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[derive(Default)]
    struct RecordingWallet {
        transfers: Mutex<Vec<(String, u128)>>,
        reject: bool,
    }

    #[async_trait]
    impl WalletClient for RecordingWallet {
        async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
            if self.reject {
                return Err(WalletError::Rejected("user denied signature".into()));
            }
            Ok(format!("0xsig-{}", message.len()))
        }

        async fn send_transaction(&self, to: &str, value_wei: u128) -> Result<String, WalletError> {
            self.transfers.lock().unwrap().push((to.to_string(), value_wei));
            Ok("0xtxhash".to_string())
        }
    }

    #[tokio::test]
    async fn test_transfer_is_converted_to_wei() {
        let wallet = Arc::new(RecordingWallet::default());
        let service = WalletService::new(wallet.clone());

        let status = service.send_transfer(RECIPIENT, "0.5").await;

        assert_eq!(status, WalletStatus::Succeeded("0xtxhash".into()));
        assert_eq!(
            wallet.transfers.lock().unwrap().as_slice(),
            &[(RECIPIENT.to_string(), 500_000_000_000_000_000)]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_wallet() {
        let wallet = Arc::new(RecordingWallet::default());
        let service = WalletService::new(wallet.clone());

        assert_eq!(
            service.send_transfer("", "1").await,
            WalletStatus::Failed("Please fill in recipient address and amount".into())
        );
        assert!(matches!(service.send_transfer("0x123", "1").await, WalletStatus::Failed(_)));
        assert!(matches!(service.send_transfer(RECIPIENT, "-2").await, WalletStatus::Failed(_)));
        assert_eq!(
            service.sign_message("   ").await,
            WalletStatus::Failed("Please enter a message to sign".into())
        );
        assert!(wallet.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_and_disconnected_wallet() {
        let rejecting = WalletService::new(Arc::new(RecordingWallet {
            reject: true,
            ..Default::default()
        }));
        assert_eq!(
            rejecting.sign_message("hello").await,
            WalletStatus::Rejected("user denied signature".into())
        );

        let disconnected = WalletService::new(Arc::new(DisconnectedWallet));
        assert_eq!(
            disconnected.sign_message("hello").await,
            WalletStatus::Failed("wallet not connected".into())
        );
    }
}
