//! Axum route handlers for creating, verifying and reading payment intents.
//!
//! Every intent route is scoped to the caller named in the `X-Owner-Id`
//! header. Authenticating that identity is left to whatever sits in front of
//! this server.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use chainpay::chain::ChainReader;
use chainpay::config::PaymentConfig;
use chainpay::error::ConfigError;
use chainpay::intent::{IntentAmount, IntentStatus, PaymentIntent};
use chainpay::store::IntentStore;
use chainpay::{IntentFactory, PaymentVerifier, VerifierOptions};
use chainpay_evm::JsonRpcChainReader;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// Header carrying the caller's identity.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Store shared by the factory and the verifier.
pub type SharedStore = Arc<dyn IntentStore>;

/// Chain reader used by the verifier.
pub type SharedChain = Arc<dyn ChainReader>;

/// Application state shared by every handler.
pub struct AppState {
    factory: IntentFactory<SharedStore>,
    verifier: Result<PaymentVerifier<SharedStore, SharedChain>, ConfigError>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", self.factory.config())
            .field("verifier", &self.verifier.as_ref().map(|v| v.options()))
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates the state from explicit parts.
    ///
    /// `chain` is an error when no node is configured; verification then
    /// answers `503` while intent creation keeps working.
    #[must_use]
    pub fn new(
        config: PaymentConfig,
        store: SharedStore,
        chain: Result<SharedChain, ConfigError>,
    ) -> Self {
        let options = VerifierOptions {
            required_confirmations: config.required_confirmations,
        };
        let verifier =
            chain.map(|chain| PaymentVerifier::new(Arc::clone(&store), chain, options));
        Self {
            factory: IntentFactory::new(config, store),
            verifier,
        }
    }

    /// Creates the state with a JSON-RPC chain reader built from `config`.
    #[must_use]
    pub fn from_config(config: PaymentConfig, store: SharedStore) -> Self {
        let chain = JsonRpcChainReader::from_config(&config)
            .map(|reader| Arc::new(reader) as SharedChain);
        if let Err(e) = &chain {
            tracing::warn!(error = %e, "Verification disabled");
        }
        Self::new(config, store, chain)
    }
}

/// Shared handle to [`AppState`].
pub type SharedState = Arc<AppState>;

/// Caller identity taken from the `X-Owner-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_owned()))
            .ok_or(ServerError::MissingOwner)
    }
}

/// Body of `POST /intents/{reference}/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Hash of the transaction the payer claims pays the intent.
    pub transaction_hash: String,
}

/// Result of `POST /intents/{reference}/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the intent is confirmed.
    pub success: bool,
    /// Intent status after this attempt, absent if the intent was not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IntentStatus>,
    /// Machine-readable outcome code.
    pub reason: String,
    /// Message safe to show to the payer.
    pub message: String,
    /// Whether the same request may succeed later.
    pub retryable: bool,
    /// Confirmations observed.
    pub confirmations: u64,
    /// The intent after this attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<PaymentIntent>,
}

/// `POST /intents` - Creates a payment intent.
///
/// # Errors
///
/// Returns 4xx on a malformed body or unusable amount, 500 if the treasury
/// is not configured.
pub async fn create_intent(
    State(state): State<SharedState>,
    OwnerId(owner): OwnerId,
    body: Result<Json<IntentAmount>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentIntent>), ServerError> {
    let Json(amount) = body?;
    let intent = state.factory.create_intent(&owner, amount).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

/// `POST /intents/{reference}/verify` - Verifies a claimed transaction.
///
/// Payment outcomes, including rejections, are `200` responses.
///
/// # Errors
///
/// Returns 4xx on a malformed body, 503 if no node is configured, 500 if
/// the store fails.
pub async fn verify_intent(
    State(state): State<SharedState>,
    OwnerId(owner): OwnerId,
    Path(reference): Path<String>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ServerError> {
    let Json(body) = body?;
    let verifier = state
        .verifier
        .as_ref()
        .map_err(|e| ServerError::ChainUnavailable(e.clone()))?;
    let result = verifier
        .verify(&owner, &reference, &body.transaction_hash)
        .await?;
    Ok(Json(VerifyResponse {
        success: result.success(),
        status: result.intent.as_ref().map(|i| i.status),
        reason: result.outcome.reason().to_owned(),
        message: result.message().to_owned(),
        retryable: result.outcome.is_retryable(),
        confirmations: result.confirmations(),
        intent: result.intent,
    }))
}

/// `GET /intents/{reference}` - Returns one of the caller's intents.
///
/// # Errors
///
/// Returns 404 if the caller has no intent with this reference.
pub async fn get_intent(
    State(state): State<SharedState>,
    OwnerId(owner): OwnerId,
    Path(reference): Path<String>,
) -> Result<Json<PaymentIntent>, ServerError> {
    state
        .factory
        .store()
        .get(&reference, &owner)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound)
}

/// `GET /health` - Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Creates a [`Router`] with every endpoint.
///
/// - `POST /intents`
/// - `GET /intents/{reference}`
/// - `POST /intents/{reference}/verify`
/// - `GET /health`
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/intents", post(create_intent))
        .route("/intents/{reference}", get(get_intent))
        .route("/intents/{reference}/verify", post(verify_intent))
        .route("/health", get(health))
        .with_state(state)
}
