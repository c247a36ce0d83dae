//! Creation of new payment intents.

use std::time::{Duration, SystemTime};

use rust_decimal::Decimal;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::amount::{round_amount, to_base_units};
use crate::config::PaymentConfig;
use crate::error::{IntentError, StoreError};
use crate::intent::{
    IntentAmount, IntentStatus, PaymentIntent, generate_reference, memo_for_reference,
};
use crate::store::IntentStore;
use crate::timestamp::UnixTimestamp;

/// How many fresh references are tried before a collision is reported.
const MAX_REFERENCE_ATTEMPTS: usize = 3;

/// Builds and persists [`PaymentIntent`]s from requested amounts.
#[derive(Debug)]
pub struct IntentFactory<S> {
    config: PaymentConfig,
    store: S,
}

impl<S: IntentStore> IntentFactory<S> {
    /// Creates a factory over the given configuration and store.
    pub const fn new(config: PaymentConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Returns the configuration intents are created from.
    pub const fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Creates a pending intent for `owner_id` using the system clock.
    ///
    /// # Errors
    ///
    /// See [`Self::create_intent_at`].
    pub async fn create_intent(
        &self,
        owner_id: &str,
        amount: IntentAmount,
    ) -> Result<PaymentIntent, IntentError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        self.create_intent_at(owner_id, amount, now).await
    }

    /// Creates a pending intent as of `now` (time since the Unix epoch).
    ///
    /// # Errors
    ///
    /// - [`IntentError::Config`] if no treasury address is configured.
    /// - [`IntentError::InvalidAmount`] if no positive amount can be resolved
    ///   or it rounds to zero base units.
    /// - [`IntentError::Amount`] if the amount overflows base units.
    /// - [`IntentError::Store`] if persisting fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(owner_id = %owner_id)))]
    pub async fn create_intent_at(
        &self,
        owner_id: &str,
        amount: IntentAmount,
        now: Duration,
    ) -> Result<PaymentIntent, IntentError> {
        let config = &self.config;
        let treasury = config.treasury()?.to_owned();
        let decimals = config.decimals();

        let native = resolve_native_amount(&amount, config.positive_usd_rate())?;
        let amount_native = round_amount(native, decimals);
        let amount_base_units = to_base_units(native, decimals)?;
        if amount_base_units.is_zero() {
            return Err(IntentError::InvalidAmount("amount rounds to zero base units"));
        }

        let created_at = UnixTimestamp::from_secs(now.as_secs());
        let expires_at = created_at.plus_minutes(config.intent_ttl_minutes);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let reference = generate_reference(now.as_millis());
            let intent = PaymentIntent {
                memo: memo_for_reference(&reference),
                reference,
                owner_id: owner_id.to_owned(),
                asset_symbol: config.asset_symbol().to_owned(),
                chain_id: config.chain_id,
                treasury_address: treasury.clone(),
                amount_native,
                amount_usd: amount.amount_usd,
                amount_base_units,
                decimals,
                status: IntentStatus::Pending,
                created_at,
                expires_at,
                confirmed_at: None,
                transaction_hash: None,
                confirmations: 0,
            };
            match self.store.insert(intent.clone()).await {
                Ok(()) => {
                    #[cfg(feature = "telemetry")]
                    tracing::info!(
                        reference = %intent.reference,
                        amount_native = %intent.amount_native,
                        asset = %intent.asset_symbol,
                        expires_at = %intent.expires_at,
                        "Created payment intent"
                    );
                    return Ok(intent);
                }
                Err(StoreError::DuplicateReference(_)) if attempt < MAX_REFERENCE_ATTEMPTS => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Picks the native amount: a positive native amount wins, otherwise a
/// positive USD amount is converted at a positive rate.
fn resolve_native_amount(
    amount: &IntentAmount,
    usd_rate: Option<Decimal>,
) -> Result<Decimal, IntentError> {
    if let Some(native) = amount.amount_native.filter(|a| *a > Decimal::ZERO) {
        return Ok(native);
    }
    let usd = amount
        .amount_usd
        .filter(|a| *a > Decimal::ZERO)
        .ok_or(IntentError::InvalidAmount(
            "a positive native or USD amount is required",
        ))?;
    let rate = usd_rate.ok_or(IntentError::InvalidAmount(
        "no positive USD conversion rate is configured",
    ))?;
    usd.checked_div(rate)
        .filter(|native| *native > Decimal::ZERO)
        .ok_or(IntentError::InvalidAmount("USD amount cannot be converted"))
}
