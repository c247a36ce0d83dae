//! [`ChainReader`] over a node's HTTP JSON-RPC endpoint.

use std::time::Duration;

use alloy_rpc_client::RpcClient;
use alloy_transport_http::Http;
use async_trait::async_trait;
use chainpay::chain::{ChainReader, RpcReceipt, RpcTransaction};
use chainpay::config::PaymentConfig;
use chainpay::error::ConfigError;
use chainpay::hex::parse_hex_u64;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

/// Reads transactions, receipts and the head block from an EVM node.
///
/// Every call is bounded by a timeout. Transport failures, non-success HTTP
/// statuses, JSON-RPC errors, malformed results and timeouts all come back as
/// `None`.
#[derive(Debug, Clone)]
pub struct JsonRpcChainReader {
    client: RpcClient,
    url: Url,
    timeout: Duration,
}

impl JsonRpcChainReader {
    /// Creates a reader for `url` with a per-call `timeout`.
    #[must_use]
    pub fn new(url: Url, timeout: Duration) -> Self {
        #[cfg(feature = "telemetry")]
        tracing::info!(rpc_url = %url, ?timeout, "Using HTTP transport");
        let client = RpcClient::new(Http::new(url.clone()), false);
        Self {
            client,
            url,
            timeout,
        }
    }

    /// Creates a reader from the `rpc_url` and `rpc_timeout_secs` settings.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingRpcUrl`] if no URL is configured.
    /// - [`ConfigError::InvalidRpcUrl`] if it does not parse or is not HTTP(S).
    pub fn from_config(config: &PaymentConfig) -> Result<Self, ConfigError> {
        let raw = config.rpc_url()?;
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidRpcUrl(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRpcUrl(format!(
                "{raw}: only http and https endpoints are supported"
            )));
        }
        let timeout = Duration::from_secs(config.rpc_timeout_secs.max(1));
        Ok(Self::new(url, timeout))
    }

    /// The node endpoint.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Sends one JSON-RPC request and decodes its `result`.
    ///
    /// Returns `None` whenever no usable answer arrives in time.
    pub async fn call<R>(&self, method: &'static str, params: Value) -> Option<R>
    where
        R: DeserializeOwned + std::fmt::Debug + Send + Sync + Unpin + 'static,
    {
        let request = self.client.request::<_, R>(method, params);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(error)) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(method, %error, "RPC call failed");
                #[cfg(not(feature = "telemetry"))]
                let _ = error;
                None
            }
            Err(_) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(method, timeout = ?self.timeout, "RPC call timed out");
                None
            }
        }
    }
}

#[async_trait]
impl ChainReader for JsonRpcChainReader {
    async fn transaction_by_hash(&self, hash: &str) -> Option<RpcTransaction> {
        self.call::<Option<RpcTransaction>>("eth_getTransactionByHash", json!([hash]))
            .await
            .flatten()
    }

    async fn transaction_receipt(&self, hash: &str) -> Option<RpcReceipt> {
        self.call::<Option<RpcReceipt>>("eth_getTransactionReceipt", json!([hash]))
            .await
            .flatten()
    }

    async fn block_number(&self) -> Option<u64> {
        self.call::<String>("eth_blockNumber", json!([]))
            .await
            .map(|n| parse_hex_u64(&n))
    }
}
