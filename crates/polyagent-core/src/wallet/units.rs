//! Input validation for wallet requests.

use super::client::WalletError;
use rust_decimal::Decimal;
use std::str::FromStr;

const ETHER_DECIMALS: u32 = 18;

/// Parses a decimal ether amount into wei.
///
/// Accepts plain decimals such as `1` or `0.5` with at most 18 fractional
/// digits. Zero, negative and non-numeric amounts are rejected.
pub fn parse_ether(amount: &str) -> Result<u128, WalletError> {
    let invalid = || WalletError::InvalidInput(format!("invalid amount: '{}'", amount));

    let parsed = Decimal::from_str(amount.trim()).map_err(|_| invalid())?;
    if parsed <= Decimal::ZERO {
        return Err(WalletError::InvalidInput("amount must be greater than zero".to_string()));
    }
    let parsed = parsed.normalize();
    if parsed.scale() > ETHER_DECIMALS {
        return Err(WalletError::InvalidInput(format!(
            "amount '{}' has more than {} decimal places",
            amount, ETHER_DECIMALS
        )));
    }

    u128::try_from(parsed.mantissa())
        .ok()
        .and_then(|mantissa| mantissa.checked_mul(10u128.pow(ETHER_DECIMALS - parsed.scale())))
        .ok_or_else(invalid)
}

/// Checks that `address` is `0x` followed by 40 hex digits.
pub fn validate_address(address: &str) -> Result<(), WalletError> {
    let valid = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(WalletError::InvalidInput(format!("invalid recipient address: '{}'", address)))
    }
}
