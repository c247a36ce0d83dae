//! Read-only view of the chain used by the verification engine.
//!
//! Implementations answer `None` whenever the node cannot currently give an
//! answer: transport failures, timeouts, JSON-RPC errors and `null` results
//! all look the same to the engine. `None` means "unknown", never "no".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::hex::{parse_hex_integer, parse_hex_u64};

/// Subset of `eth_getTransactionByHash` the engine inspects.
///
/// Every field is kept as the raw hex string the node returned and parsed
/// leniently on use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash.
    #[serde(default)]
    pub hash: Option<String>,
    /// Recipient; absent for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    /// Transferred value in base units.
    #[serde(default)]
    pub value: Option<String>,
    /// Call data.
    #[serde(default)]
    pub input: Option<String>,
    /// Block containing the transaction; absent while pending.
    #[serde(default)]
    pub block_number: Option<String>,
}

impl RpcTransaction {
    /// Block number, if the transaction has been mined.
    #[must_use]
    pub fn mined_block(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .map(parse_hex_u64)
            .filter(|n| *n > 0)
    }
}

/// Subset of `eth_getTransactionReceipt` the engine inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Execution status, `0x1` on success.
    #[serde(default)]
    pub status: Option<String>,
    /// Block containing the transaction.
    #[serde(default)]
    pub block_number: Option<String>,
}

impl RpcReceipt {
    /// Returns `true` only for an explicit success status.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| parse_hex_integer(s) == alloy_primitives::U256::from(1u8))
    }
}

/// Chain primitives needed to verify a payment.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetches a transaction by hash.
    async fn transaction_by_hash(&self, hash: &str) -> Option<RpcTransaction>;

    /// Fetches the receipt of a mined transaction.
    async fn transaction_receipt(&self, hash: &str) -> Option<RpcReceipt>;

    /// Fetches the current head block number.
    async fn block_number(&self) -> Option<u64>;
}

#[async_trait]
impl<T: ChainReader + ?Sized> ChainReader for Arc<T> {
    async fn transaction_by_hash(&self, hash: &str) -> Option<RpcTransaction> {
        (**self).transaction_by_hash(hash).await
    }

    async fn transaction_receipt(&self, hash: &str) -> Option<RpcReceipt> {
        (**self).transaction_receipt(hash).await
    }

    async fn block_number(&self) -> Option<u64> {
        (**self).block_number().await
    }
}

/// Number of blocks on top of and including the transaction's block.
///
/// Zero while the transaction is unmined, the head is unknown, or the head
/// lags behind the transaction's block.
#[must_use]
pub fn confirmations(head: Option<u64>, tx_block: Option<u64>) -> u64 {
    match (head, tx_block) {
        (Some(head), Some(block)) if head >= block => (head - block).saturating_add(1),
        _ => 0,
    }
}
