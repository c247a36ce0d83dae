//! Deployment-wide payment settings.
//!
//! A [`PaymentConfig`] is read once when an intent is created or a verifier is
//! built. Values that must stay stable for the life of an intent (treasury,
//! chain, asset, precision) are copied onto the intent itself.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Asset symbol used when none is configured.
pub const DEFAULT_ASSET_SYMBOL: &str = "ETH";

/// Native decimal precision used when none is configured.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Payment deployment configuration.
///
/// # Example
///
/// ```rust
/// use chainpay::config::PaymentConfig;
///
/// let config = PaymentConfig {
///     treasury_address: Some("0x00000000000000000000000000000000000000aa".into()),
///     rpc_url: Some("http://127.0.0.1:8545".into()),
///     ..PaymentConfig::default()
/// };
/// assert_eq!(config.decimals(), 18);
/// assert!(config.treasury().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Address every payment must be sent to.
    #[serde(default)]
    pub treasury_address: Option<String>,

    /// Numeric EIP-155 chain id (default: `1`).
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Native asset symbol, e.g. `ETH`.
    #[serde(default)]
    pub asset_symbol: Option<String>,

    /// Native asset decimal precision.
    #[serde(default)]
    pub decimals: Option<u8>,

    /// Price of one native unit in USD, used to derive native amounts.
    #[serde(default)]
    pub usd_rate: Option<Decimal>,

    /// Lifetime of a new intent in minutes (default: `30`).
    #[serde(default = "default_ttl_minutes")]
    pub intent_ttl_minutes: u64,

    /// JSON-RPC endpoint of the node used for verification.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Confirmations required before an intent is confirmed (default: `2`).
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u64,

    /// Per-call RPC timeout in seconds (default: `10`).
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

const fn default_chain_id() -> u64 {
    1
}

const fn default_ttl_minutes() -> u64 {
    30
}

const fn default_required_confirmations() -> u64 {
    2
}

const fn default_rpc_timeout_secs() -> u64 {
    10
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            treasury_address: None,
            chain_id: default_chain_id(),
            asset_symbol: None,
            decimals: None,
            usd_rate: None,
            intent_ttl_minutes: default_ttl_minutes(),
            rpc_url: None,
            required_confirmations: default_required_confirmations(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

/// Treats blank values and unexpanded `$VAR` references as unset.
fn resolved(value: Option<&String>) -> Option<&str> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
}

impl PaymentConfig {
    /// Returns the configured treasury address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTreasuryAddress`] if it is unset, blank,
    /// or an unexpanded environment reference.
    pub fn treasury(&self) -> Result<&str, ConfigError> {
        resolved(self.treasury_address.as_ref()).ok_or(ConfigError::MissingTreasuryAddress)
    }

    /// Returns the configured node RPC URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRpcUrl`] if it is unset, blank, or an
    /// unexpanded environment reference.
    pub fn rpc_url(&self) -> Result<&str, ConfigError> {
        resolved(self.rpc_url.as_ref()).ok_or(ConfigError::MissingRpcUrl)
    }

    /// Returns the asset symbol, falling back to [`DEFAULT_ASSET_SYMBOL`].
    #[must_use]
    pub fn asset_symbol(&self) -> &str {
        resolved(self.asset_symbol.as_ref()).unwrap_or(DEFAULT_ASSET_SYMBOL)
    }

    /// Returns the decimal precision, falling back to [`DEFAULT_DECIMALS`].
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }

    /// Returns the USD rate only if it is strictly positive.
    #[must_use]
    pub fn positive_usd_rate(&self) -> Option<Decimal> {
        self.usd_rate.filter(|rate| rate.is_sign_positive() && !rate.is_zero())
    }
}
