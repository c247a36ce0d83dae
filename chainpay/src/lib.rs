#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Payment intents settled in a chain-native asset and verified on-chain.
//!
//! A [`PaymentIntent`] asks a payer to send an exact native amount to a
//! treasury address with a unique memo in the transaction data. Later, given
//! only a transaction hash claimed by the payer, the [`PaymentVerifier`] reads
//! the transaction back from a node and decides independently whether it pays
//! the intent.
//!
//! Chain access is abstracted behind [`ChainReader`] so the core stays
//! transport-agnostic. The JSON-RPC implementation lives in `chainpay-evm`.
//!
//! # Modules
//!
//! - [`amount`] - Decimal to base-unit conversion
//! - [`chain`] - Chain reader trait and the transaction fields it returns
//! - [`config`] - Payment configuration
//! - [`error`] - Error types
//! - [`factory`] - Intent creation
//! - [`hex`] - Lenient hex parsing and address normalization
//! - [`intent`] - The intent record, references and memos
//! - [`store`] - Intent persistence
//! - [`timestamp`] - Unix timestamps
//! - [`verify`] - The verification engine
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod chain;
pub mod config;
pub mod error;
pub mod factory;
pub mod hex;
pub mod intent;
pub mod store;
pub mod timestamp;
pub mod verify;

pub use chain::ChainReader;
pub use config::PaymentConfig;
pub use error::{ConfigError, IntentError, StoreError, VerifyError};
pub use factory::IntentFactory;
pub use intent::{IntentAmount, IntentStatus, PaymentIntent};
pub use store::{IntentStore, MemoryIntentStore};
pub use timestamp::UnixTimestamp;
pub use verify::{PaymentVerifier, RejectionReason, Verification, VerificationOutcome, VerifierOptions};
