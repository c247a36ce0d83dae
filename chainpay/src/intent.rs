//! The payment intent record and its identifiers.

use std::fmt;

use alloy_primitives::U256;
use rand::RngExt;
use rand::rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::timestamp::UnixTimestamp;

/// Prefix of every generated reference.
pub const REFERENCE_PREFIX: &str = "PAY";

/// Prefix prepended to the reference to form the on-chain memo.
pub const MEMO_PREFIX: &str = "chainpay:";

/// Lifecycle state of a [`PaymentIntent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
    /// Waiting for a matching, final transaction.
    Pending,
    /// Paid. Terminal.
    Confirmed,
    /// Lapsed before payment was confirmed. Terminal.
    Expired,
}

impl IntentStatus {
    /// Returns `true` for states that never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Expired)
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Requested amount for a new intent.
///
/// A positive `amount_native` takes precedence; otherwise `amount_usd` is
/// converted at the configured rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentAmount {
    /// Amount in US dollars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<Decimal>,
    /// Amount in the chain-native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_native: Option<Decimal>,
}

impl IntentAmount {
    /// An amount given in the native asset.
    #[must_use]
    pub const fn native(amount: Decimal) -> Self {
        Self {
            amount_usd: None,
            amount_native: Some(amount),
        }
    }

    /// An amount given in US dollars.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self {
            amount_usd: Some(amount),
            amount_native: None,
        }
    }
}

/// A single-use request to pay an exact native amount to the treasury.
///
/// Only `status`, `transaction_hash`, `confirmations` and `confirmed_at`
/// change after creation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Unique reference, e.g. `PAY-18C5A3B2F10-9F00C2D1`.
    pub reference: String,
    /// Identity of the party that requested the intent.
    pub owner_id: String,
    /// Native asset symbol at creation time.
    pub asset_symbol: String,
    /// EIP-155 chain id at creation time.
    pub chain_id: u64,
    /// Recipient address at creation time.
    pub treasury_address: String,
    /// Amount in the native asset, rounded to `decimals`.
    pub amount_native: Decimal,
    /// Informational USD amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<Decimal>,
    /// `amount_native` scaled to base units.
    #[serde_as(as = "DisplayFromStr")]
    pub amount_base_units: U256,
    /// Native decimal precision used for `amount_base_units`.
    pub decimals: u8,
    /// String the paying transaction must carry in its input data.
    pub memo: String,
    /// Current lifecycle state.
    pub status: IntentStatus,
    /// Creation time.
    pub created_at: UnixTimestamp,
    /// After this instant the intent can no longer be confirmed.
    pub expires_at: UnixTimestamp,
    /// Confirmation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<UnixTimestamp>,
    /// Hash of the matched transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Confirmations observed on the last verification attempt.
    #[serde(default)]
    pub confirmations: u64,
}

impl PaymentIntent {
    /// Returns `true` if `now` is strictly past the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: UnixTimestamp) -> bool {
        now > self.expires_at
    }
}

/// Generates a new reference from the clock plus 32 random bits.
///
/// Format: `PAY-<unix millis, hex>-<8 hex digits>`.
#[must_use]
pub fn generate_reference(now_millis: u128) -> String {
    let suffix: u32 = rng().random();
    format!("{REFERENCE_PREFIX}-{now_millis:X}-{suffix:08X}")
}

/// Derives the memo for a reference.
#[must_use]
pub fn memo_for_reference(reference: &str) -> String {
    format!("{MEMO_PREFIX}{reference}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_format() {
        let reference = generate_reference(0x18C_5A3B_2F10);
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PAY");
        assert_eq!(parts[1], "18C5A3B2F10");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_references_differ_within_same_millisecond() {
        let refs: HashSet<String> = (0..64).map(|_| generate_reference(42)).collect();
        assert!(refs.len() > 60);
    }

    #[test]
    fn test_memo_embeds_reference() {
        let memo = memo_for_reference("PAY-1-00000001");
        assert_eq!(memo, "chainpay:PAY-1-00000001");
    }

    #[test]
    fn test_intent_amount_deserialize() {
        let amount: IntentAmount = serde_json::from_str(r#"{"amountUsd":"25.00"}"#).unwrap();
        assert_eq!(amount.amount_usd, Some(Decimal::new(2500, 2)));
        assert_eq!(amount.amount_native, None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(IntentStatus::Confirmed.is_terminal());
        assert!(IntentStatus::Expired.is_terminal());
    }
}
