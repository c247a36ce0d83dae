#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM chain access for chainpay.
//!
//! - [`reader`] - [`JsonRpcChainReader`], a [`ChainReader`](chainpay::chain::ChainReader)
//!   over a node's HTTP JSON-RPC endpoint
//! - [`networks`] - Known EVM networks and their native assets
//!
//! # Feature Flags
//!
//! - `telemetry` - Logs transport failures and timeouts via `tracing`

pub mod networks;
pub mod reader;

pub use networks::{KnownNetwork, apply_network_defaults, known_network};
pub use reader::JsonRpcChainReader;
