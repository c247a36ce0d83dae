//! Error types for intent creation, storage and verification.
//!
//! Only infrastructure and configuration problems are errors. A payment that
//! does not (yet) satisfy its intent is a normal
//! [`VerificationOutcome`](crate::verify::VerificationOutcome).

use crate::amount::AmountError;
use crate::intent::IntentStatus;

/// Missing or unusable deployment configuration.
///
/// These stop the operation entirely and need operator attention; retrying
/// the same request will not help.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No treasury address is configured.
    #[error("treasury address is not configured")]
    MissingTreasuryAddress,
    /// No node RPC URL is configured.
    #[error("node RPC URL is not configured")]
    MissingRpcUrl,
    /// The node RPC URL could not be parsed.
    #[error("invalid node RPC URL: {0}")]
    InvalidRpcUrl(String),
    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the intent store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An intent with this reference already exists.
    #[error("payment intent {0} already exists")]
    DuplicateReference(String),
    /// No intent exists for this reference and owner.
    #[error("payment intent {0} not found")]
    NotFound(String),
    /// A conditional update found the intent no longer pending.
    #[error("payment intent is already {current}")]
    StatusConflict {
        /// The status the intent was found in.
        current: IntentStatus,
    },
    /// Reading or writing the backing file failed.
    #[error("intent store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding or decoding stored intents failed.
    #[error("intent store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by [`IntentFactory::create_intent`](crate::factory::IntentFactory::create_intent).
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// Deployment configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Neither a positive native amount nor a convertible USD amount was given.
    #[error("invalid payment amount: {0}")]
    InvalidAmount(&'static str),
    /// The amount could not be converted to base units.
    #[error(transparent)]
    Amount(#[from] AmountError),
    /// The intent could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned by [`PaymentVerifier::verify`](crate::verify::PaymentVerifier::verify).
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The intent store failed while reading or updating the intent.
    #[error(transparent)]
    Store(#[from] StoreError),
}
