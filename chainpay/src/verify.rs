//! Verification of a claimed payment transaction against an intent.
//!
//! [`PaymentVerifier::verify`] looks the intent up, short-circuits terminal
//! states, then checks the claimed transaction in a fixed order:
//!
//! 1. the intent exists for this owner
//! 2. it is not already confirmed (no chain calls are made if it is)
//! 3. it has not expired (an expired pending intent is marked `Expired`)
//! 4. the node knows the transaction and its receipt
//! 5. the recipient is the intent's treasury address
//! 6. the value covers the required base-unit amount
//! 7. the input data carries the intent's memo
//! 8. the transaction succeeded and has enough confirmations
//!
//! The first failing check decides the [`VerificationOutcome`]. Only a pass of
//! every check confirms the intent.

use std::fmt;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainReader, RpcTransaction, confirmations};
use crate::error::{StoreError, VerifyError};
use crate::hex::{contains_memo, normalize_address, parse_hex_integer, parse_hex_u64};
use crate::intent::{IntentStatus, PaymentIntent};
use crate::store::IntentStore;
use crate::timestamp::UnixTimestamp;

/// Why a claimed payment can never satisfy the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// No intent exists for this reference and owner.
    IntentNotFound,
    /// The intent lapsed before it was confirmed.
    Expired,
    /// The transaction pays someone other than the treasury.
    RecipientMismatch,
    /// The transaction value is below the required amount.
    InsufficientAmount,
    /// The transaction input does not carry the intent's memo.
    MissingMemo,
}

impl RejectionReason {
    /// Machine-readable `snake_case` code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IntentNotFound => "intent_not_found",
            Self::Expired => "intent_expired",
            Self::RecipientMismatch => "recipient_mismatch",
            Self::InsufficientAmount => "insufficient_amount",
            Self::MissingMemo => "missing_memo",
        }
    }

    /// Human-readable message safe to show to the payer.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::IntentNotFound => "payment intent not found",
            Self::Expired => "payment intent expired",
            Self::RecipientMismatch => "transaction does not match treasury address",
            Self::InsufficientAmount => "amount below required minimum",
            Self::MissingMemo => "missing payment reference memo",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// This attempt confirmed the intent.
    Confirmed {
        /// Confirmations at the time of confirmation.
        confirmations: u64,
    },
    /// The intent had already been confirmed; nothing was checked.
    AlreadyConfirmed {
        /// Confirmations recorded when it was confirmed.
        confirmations: u64,
    },
    /// The transaction matches but is not final yet. Retry later.
    AwaitingConfirmations {
        /// Confirmations observed now.
        confirmations: u64,
        /// Confirmations required.
        required: u64,
        /// The receipt reports a failed execution.
        reverted: bool,
    },
    /// The node does not (yet) know the transaction or its receipt. Retry later.
    NotFoundOnChain,
    /// The payment can never satisfy the intent with this transaction.
    Rejected(RejectionReason),
}

impl VerificationOutcome {
    /// Returns `true` if the intent is confirmed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::AlreadyConfirmed { .. })
    }

    /// Returns `true` if the same request may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AwaitingConfirmations { .. } | Self::NotFoundOnChain)
    }

    /// Confirmations observed, or zero when none were.
    #[must_use]
    pub const fn confirmations(&self) -> u64 {
        match self {
            Self::Confirmed { confirmations }
            | Self::AlreadyConfirmed { confirmations }
            | Self::AwaitingConfirmations { confirmations, .. } => *confirmations,
            Self::NotFoundOnChain | Self::Rejected(_) => 0,
        }
    }

    /// Machine-readable `snake_case` code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } | Self::AlreadyConfirmed { .. } => "confirmed",
            Self::AwaitingConfirmations { .. } => "awaiting_confirmations",
            Self::NotFoundOnChain => "transaction_not_found",
            Self::Rejected(reason) => reason.as_str(),
        }
    }

    /// Human-readable message safe to show to the payer.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } | Self::AlreadyConfirmed { .. } => "payment confirmed",
            Self::AwaitingConfirmations { .. } => "awaiting confirmations",
            Self::NotFoundOnChain => "transaction not found",
            Self::Rejected(reason) => reason.message(),
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a verification together with the intent as it now stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// What happened.
    pub outcome: VerificationOutcome,
    /// The intent after this attempt, if it exists.
    pub intent: Option<PaymentIntent>,
}

impl Verification {
    const fn new(outcome: VerificationOutcome, intent: Option<PaymentIntent>) -> Self {
        Self { outcome, intent }
    }

    /// See [`VerificationOutcome::is_success`].
    #[must_use]
    pub const fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// See [`VerificationOutcome::message`].
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.outcome.message()
    }

    /// See [`VerificationOutcome::confirmations`].
    #[must_use]
    pub const fn confirmations(&self) -> u64 {
        self.outcome.confirmations()
    }
}

/// Settings fixed for the lifetime of a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierOptions {
    /// Confirmations a transaction needs before the intent is confirmed.
    pub required_confirmations: u64,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            required_confirmations: 2,
        }
    }
}

/// Checks recipient, amount and memo of a transaction against an intent.
///
/// # Errors
///
/// Returns the first [`RejectionReason`] that applies.
pub fn check_transaction(intent: &PaymentIntent, tx: &RpcTransaction) -> Result<(), RejectionReason> {
    let to = normalize_address(tx.to.as_deref().unwrap_or_default());
    let treasury = normalize_address(&intent.treasury_address);
    if to.is_empty() || to != treasury {
        return Err(RejectionReason::RecipientMismatch);
    }

    let value = parse_hex_integer(tx.value.as_deref().unwrap_or_default());
    if value < intent.amount_base_units {
        return Err(RejectionReason::InsufficientAmount);
    }

    if !intent.memo.is_empty() && !contains_memo(tx.input.as_deref().unwrap_or_default(), &intent.memo)
    {
        return Err(RejectionReason::MissingMemo);
    }

    Ok(())
}

/// Confirms intents against transactions read from a [`ChainReader`].
#[derive(Debug)]
pub struct PaymentVerifier<S, C> {
    store: S,
    chain: C,
    options: VerifierOptions,
}

impl<S: IntentStore, C: ChainReader> PaymentVerifier<S, C> {
    /// Creates a verifier.
    pub const fn new(store: S, chain: C, options: VerifierOptions) -> Self {
        Self {
            store,
            chain,
            options,
        }
    }

    /// Returns the verifier settings.
    pub const fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Verifies `transaction_hash` against the intent `reference` using the
    /// system clock.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_at`].
    pub async fn verify(
        &self,
        owner_id: &str,
        reference: &str,
        transaction_hash: &str,
    ) -> Result<Verification, VerifyError> {
        self.verify_at(owner_id, reference, transaction_hash, UnixTimestamp::now())
            .await
    }

    /// Verifies `transaction_hash` against the intent `reference` as of `now`.
    ///
    /// Safe to call repeatedly: retryable outcomes leave the intent pending and
    /// a confirmed intent answers without touching the chain.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Store`] only if the intent store fails. Every
    /// payment-related result is a [`VerificationOutcome`].
    #[cfg_attr(feature = "telemetry", instrument(
        name = "chainpay.verify",
        skip_all,
        err,
        fields(reference = %reference, tx = %transaction_hash)
    ))]
    pub async fn verify_at(
        &self,
        owner_id: &str,
        reference: &str,
        transaction_hash: &str,
        now: UnixTimestamp,
    ) -> Result<Verification, VerifyError> {
        let Some(intent) = self.store.get(reference, owner_id).await? else {
            return Ok(Verification::new(
                VerificationOutcome::Rejected(RejectionReason::IntentNotFound),
                None,
            ));
        };

        if intent.status.is_terminal() {
            return Ok(terminal(intent));
        }

        if intent.is_expired_at(now) {
            return self.expire(intent).await;
        }

        let transaction_hash = transaction_hash.trim();
        if transaction_hash.is_empty() {
            return Ok(Verification::new(
                VerificationOutcome::NotFoundOnChain,
                Some(intent),
            ));
        }
        let Some(tx) = self.chain.transaction_by_hash(transaction_hash).await else {
            return Ok(not_found(intent));
        };
        let Some(receipt) = self.chain.transaction_receipt(transaction_hash).await else {
            return Ok(not_found(intent));
        };

        if let Err(reason) = check_transaction(&intent, &tx) {
            #[cfg(feature = "telemetry")]
            tracing::info!(reason = reason.as_str(), "Rejected payment transaction");
            return Ok(Verification::new(
                VerificationOutcome::Rejected(reason),
                Some(intent),
            ));
        }

        let head = self.chain.block_number().await;
        let tx_block = tx.mined_block().or_else(|| {
            receipt
                .block_number
                .as_deref()
                .map(parse_hex_u64)
                .filter(|n| *n > 0)
        });
        let confirmations = confirmations(head, tx_block);
        let required = self.options.required_confirmations;
        let reverted = !receipt.succeeded();

        if reverted || confirmations < required {
            #[cfg(feature = "telemetry")]
            tracing::debug!(confirmations, required, reverted, "Awaiting confirmations");
            let outcome = VerificationOutcome::AwaitingConfirmations {
                confirmations,
                required,
                reverted,
            };
            return match self
                .store
                .record_observation(&intent.reference, owner_id, transaction_hash, confirmations)
                .await
            {
                Ok(updated) => Ok(Verification::new(outcome, Some(updated))),
                Err(StoreError::StatusConflict { current }) => {
                    self.resolve_conflict(&intent, current).await
                }
                Err(e) => Err(e.into()),
            };
        }

        match self
            .store
            .confirm(
                &intent.reference,
                owner_id,
                transaction_hash,
                confirmations,
                now,
            )
            .await
        {
            Ok(confirmed) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(confirmations, "Payment intent confirmed");
                Ok(Verification::new(
                    VerificationOutcome::Confirmed { confirmations },
                    Some(confirmed),
                ))
            }
            Err(StoreError::StatusConflict { current }) => {
                self.resolve_conflict(&intent, current).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Marks a lapsed pending intent as expired.
    async fn expire(&self, intent: PaymentIntent) -> Result<Verification, VerifyError> {
        match self.store.expire(&intent.reference, &intent.owner_id).await {
            Ok(expired) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(expires_at = %expired.expires_at, "Payment intent expired");
                Ok(Verification::new(
                    VerificationOutcome::Rejected(RejectionReason::Expired),
                    Some(expired),
                ))
            }
            Err(StoreError::StatusConflict { current }) => {
                self.resolve_conflict(&intent, current).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reports the terminal state another caller moved the intent into.
    async fn resolve_conflict(
        &self,
        intent: &PaymentIntent,
        current: IntentStatus,
    ) -> Result<Verification, VerifyError> {
        let latest = self
            .store
            .get(&intent.reference, &intent.owner_id)
            .await?
            .unwrap_or_else(|| PaymentIntent {
                status: current,
                ..intent.clone()
            });
        if current.is_terminal() {
            Ok(terminal(latest))
        } else {
            Ok(not_found(latest))
        }
    }
}

/// Answer for an intent that is confirmed or expired.
fn terminal(intent: PaymentIntent) -> Verification {
    let outcome = match intent.status {
        IntentStatus::Confirmed => VerificationOutcome::AlreadyConfirmed {
            confirmations: intent.confirmations,
        },
        IntentStatus::Expired | IntentStatus::Pending => {
            VerificationOutcome::Rejected(RejectionReason::Expired)
        }
    };
    Verification::new(outcome, Some(intent))
}

fn not_found(intent: PaymentIntent) -> Verification {
    Verification::new(VerificationOutcome::NotFoundOnChain, Some(intent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::RpcReceipt;
    use crate::store::MemoryIntentStore;
    use crate::store::tests::sample_intent;
    use alloy_primitives::{U256, hex};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TREASURY: &str = "0x00000000000000000000000000000000000000aa";
    const TX: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[derive(Debug, Default)]
    struct FakeChain {
        tx: Option<RpcTransaction>,
        receipt: Option<RpcReceipt>,
        head: Option<u64>,
        calls: AtomicUsize,
    }

    impl FakeChain {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChainReader for FakeChain {
        async fn transaction_by_hash(&self, _hash: &str) -> Option<RpcTransaction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tx.clone()
        }

        async fn transaction_receipt(&self, _hash: &str) -> Option<RpcReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.receipt.clone()
        }

        async fn block_number(&self) -> Option<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.head
        }
    }

    fn paying_tx(intent: &PaymentIntent, value: &str) -> RpcTransaction {
        RpcTransaction {
            hash: Some(TX.into()),
            to: Some(intent.treasury_address.to_uppercase().replacen("0X", "0x", 1)),
            value: Some(value.into()),
            input: Some(format!("0x{}", hex::encode(&intent.memo))),
            block_number: Some("0x64".into()),
        }
    }

    fn success_receipt() -> RpcReceipt {
        RpcReceipt {
            status: Some("0x1".into()),
            block_number: Some("0x64".into()),
        }
    }

    /// Head at block 102, transaction at 100: three confirmations.
    fn chain_for(intent: &PaymentIntent) -> FakeChain {
        FakeChain {
            tx: Some(paying_tx(intent, "0x0B1A2BC2EC500000")),
            receipt: Some(success_receipt()),
            head: Some(102),
            ..FakeChain::default()
        }
    }

    async fn setup(
        chain: impl FnOnce(&PaymentIntent) -> FakeChain,
    ) -> PaymentVerifier<Arc<MemoryIntentStore>, Arc<FakeChain>> {
        let store = Arc::new(MemoryIntentStore::new());
        let intent = sample_intent("PAY-1", "alice");
        let chain = Arc::new(chain(&intent));
        store.insert(intent).await.unwrap();
        PaymentVerifier::new(
            store,
            chain,
            VerifierOptions {
                required_confirmations: 2,
            },
        )
    }

    const NOW: UnixTimestamp = UnixTimestamp::from_secs(1_500);

    #[tokio::test]
    async fn test_confirms_matching_payment() {
        let verifier = setup(chain_for).await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Confirmed { confirmations: 3 }
        );
        assert!(result.success());
        assert_eq!(result.confirmations(), 3);
        let intent = result.intent.unwrap();
        assert_eq!(intent.status, IntentStatus::Confirmed);
        assert_eq!(intent.transaction_hash.as_deref(), Some(TX));
        assert_eq!(intent.confirmations, 3);
        assert_eq!(intent.confirmed_at, Some(NOW));
    }

    #[tokio::test]
    async fn test_second_verify_makes_no_chain_calls() {
        let store = Arc::new(MemoryIntentStore::new());
        let intent = sample_intent("PAY-1", "alice");
        let chain = Arc::new(chain_for(&intent));
        store.insert(intent).await.unwrap();
        let verifier = PaymentVerifier::new(
            Arc::clone(&store),
            Arc::clone(&chain),
            VerifierOptions::default(),
        );

        let first = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert!(first.success());
        let calls = chain.calls();
        assert_eq!(calls, 3);

        let second = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            second.outcome,
            VerificationOutcome::AlreadyConfirmed { confirmations: 3 }
        );
        assert!(second.success());
        assert_eq!(chain.calls(), calls);
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let verifier = setup(chain_for).await;
        let result = verifier.verify_at("alice", "PAY-404", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Rejected(RejectionReason::IntentNotFound)
        );
        assert_eq!(result.message(), "payment intent not found");
        assert!(result.intent.is_none());
    }

    #[tokio::test]
    async fn test_other_owner_cannot_verify() {
        let verifier = setup(chain_for).await;
        let result = verifier.verify_at("mallory", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Rejected(RejectionReason::IntentNotFound)
        );
    }

    #[tokio::test]
    async fn test_expired_intent_is_marked_without_chain_calls() {
        let store = Arc::new(MemoryIntentStore::new());
        let intent = sample_intent("PAY-1", "alice");
        let chain = Arc::new(chain_for(&intent));
        store.insert(intent).await.unwrap();
        let verifier =
            PaymentVerifier::new(Arc::clone(&store), Arc::clone(&chain), VerifierOptions::default());

        let later = UnixTimestamp::from_secs(2_801);
        let result = verifier.verify_at("alice", "PAY-1", TX, later).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Rejected(RejectionReason::Expired)
        );
        assert_eq!(result.message(), "payment intent expired");
        assert!(!result.outcome.is_retryable());
        assert_eq!(chain.calls(), 0);
        let stored = store.get("PAY-1", "alice").await.unwrap().unwrap();
        assert_eq!(stored.status, IntentStatus::Expired);

        // Terminal: the same answer without touching the chain again.
        let again = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            again.outcome,
            VerificationOutcome::Rejected(RejectionReason::Expired)
        );
        assert_eq!(chain.calls(), 0);
    }

    #[tokio::test]
    async fn test_expiry_boundary_is_exclusive() {
        let verifier = setup(chain_for).await;
        let at_expiry = UnixTimestamp::from_secs(2_800);
        let result = verifier.verify_at("alice", "PAY-1", TX, at_expiry).await.unwrap();
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_missing_transaction_is_retryable() {
        let verifier = setup(|intent| FakeChain {
            tx: None,
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::NotFoundOnChain);
        assert_eq!(result.message(), "transaction not found");
        assert!(result.outcome.is_retryable());
        assert_eq!(result.intent.unwrap().status, IntentStatus::Pending);
    }

    #[tokio::test]
    async fn test_missing_receipt_is_retryable() {
        let verifier = setup(|intent| FakeChain {
            receipt: None,
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::NotFoundOnChain);
    }

    #[tokio::test]
    async fn test_empty_hash_is_not_found() {
        let verifier = setup(chain_for).await;
        let result = verifier.verify_at("alice", "PAY-1", "  ", NOW).await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::NotFoundOnChain);
    }

    #[tokio::test]
    async fn test_wrong_recipient_rejected() {
        let verifier = setup(|intent| {
            let mut chain = chain_for(intent);
            if let Some(tx) = chain.tx.as_mut() {
                tx.to = Some("0x00000000000000000000000000000000000000AB".into());
            }
            chain
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Rejected(RejectionReason::RecipientMismatch)
        );
        assert_eq!(result.message(), "transaction does not match treasury address");
        assert!(!result.outcome.is_retryable());
        assert_eq!(result.intent.unwrap().status, IntentStatus::Pending);
    }

    #[test]
    fn test_recipient_case_permutations() {
        let intent = sample_intent("PAY-1", "alice");
        let same_body = TREASURY.trim_start_matches("0x");
        let other_body = "00000000000000000000000000000000000000ab";
        // Every case permutation of the two letters in each address.
        for mask in 0..4u8 {
            let permute = |body: &str| -> String {
                let mut seen = 0;
                body.chars()
                    .map(|c| {
                        if c.is_ascii_alphabetic() {
                            let upper = mask & (1 << seen) != 0;
                            seen += 1;
                            if upper { c.to_ascii_uppercase() } else { c }
                        } else {
                            c
                        }
                    })
                    .collect()
            };
            let mut tx = paying_tx(&intent, "0x0B1A2BC2EC500000");

            tx.to = Some(format!("0x{}", permute(other_body)));
            assert_eq!(
                check_transaction(&intent, &tx),
                Err(RejectionReason::RecipientMismatch)
            );

            tx.to = Some(format!("0x{}", permute(same_body)));
            assert_eq!(check_transaction(&intent, &tx), Ok(()));
        }
    }

    #[test]
    fn test_missing_recipient_never_matches() {
        let mut intent = sample_intent("PAY-1", "alice");
        let mut tx = paying_tx(&intent, "0x0B1A2BC2EC500000");
        tx.to = None;
        assert_eq!(
            check_transaction(&intent, &tx),
            Err(RejectionReason::RecipientMismatch)
        );
        intent.treasury_address = String::new();
        tx.to = Some(String::new());
        assert_eq!(
            check_transaction(&intent, &tx),
            Err(RejectionReason::RecipientMismatch)
        );
    }

    #[test]
    fn test_amount_boundaries() {
        let intent = sample_intent("PAY-1", "alice");
        let required = intent.amount_base_units;
        let hex_of = |v: U256| format!("{v:#x}");

        let exact = paying_tx(&intent, &hex_of(required));
        assert_eq!(check_transaction(&intent, &exact), Ok(()));

        let short = paying_tx(&intent, &hex_of(required - U256::from(1u8)));
        assert_eq!(
            check_transaction(&intent, &short),
            Err(RejectionReason::InsufficientAmount)
        );

        let over = paying_tx(&intent, &hex_of(required + U256::from(1u8)));
        assert_eq!(check_transaction(&intent, &over), Ok(()));

        let malformed = paying_tx(&intent, "0xnothex");
        assert_eq!(
            check_transaction(&intent, &malformed),
            Err(RejectionReason::InsufficientAmount)
        );
    }

    #[test]
    fn test_memo_checks() {
        let intent = sample_intent("PAY-1", "alice");
        let mut tx = paying_tx(&intent, "0x0B1A2BC2EC500000");
        tx.input = Some(format!("0xCAFE{}", hex::encode_upper(&intent.memo)));
        assert_eq!(check_transaction(&intent, &tx), Ok(()));

        tx.input = Some("0x".into());
        assert_eq!(
            check_transaction(&intent, &tx),
            Err(RejectionReason::MissingMemo)
        );

        tx.input = Some(format!("0x{}", hex::encode("chainpay:PAY-2")));
        assert_eq!(
            check_transaction(&intent, &tx),
            Err(RejectionReason::MissingMemo)
        );

        let mut no_memo = intent;
        no_memo.memo = String::new();
        tx.input = None;
        assert_eq!(check_transaction(&no_memo, &tx), Ok(()));
    }

    #[tokio::test]
    async fn test_insufficient_confirmations_stay_pending() {
        let verifier = setup(|intent| FakeChain {
            head: Some(100),
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::AwaitingConfirmations {
                confirmations: 1,
                required: 2,
                reverted: false,
            }
        );
        assert_eq!(result.message(), "awaiting confirmations");
        assert_eq!(result.confirmations(), 1);
        assert!(result.outcome.is_retryable());
        let intent = result.intent.unwrap();
        assert_eq!(intent.status, IntentStatus::Pending);
        assert_eq!(intent.confirmations, 1);
        assert_eq!(intent.transaction_hash.as_deref(), Some(TX));
        assert!(intent.confirmed_at.is_none());
    }

    #[tokio::test]
    async fn test_exactly_required_confirmations_confirms() {
        // Head 101, transaction at 100: two confirmations, two required.
        let verifier = setup(|intent| FakeChain {
            head: Some(101),
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Confirmed { confirmations: 2 }
        );
        assert_eq!(result.intent.unwrap().status, IntentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_unmined_transaction_has_zero_confirmations() {
        let verifier = setup(|intent| {
            let mut chain = chain_for(intent);
            if let Some(tx) = chain.tx.as_mut() {
                tx.block_number = None;
            }
            chain.receipt = Some(RpcReceipt {
                status: Some("0x1".into()),
                block_number: None,
            });
            chain
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(result.confirmations(), 0);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_head_behind_transaction_never_negative() {
        let verifier = setup(|intent| FakeChain {
            head: Some(50),
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(result.confirmations(), 0);
        assert!(result.outcome.is_retryable());
    }

    #[tokio::test]
    async fn test_reverted_transaction_never_confirms() {
        let verifier = setup(|intent| FakeChain {
            receipt: Some(RpcReceipt {
                status: Some("0x0".into()),
                block_number: Some("0x64".into()),
            }),
            head: Some(200),
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::AwaitingConfirmations {
                confirmations: 101,
                required: 2,
                reverted: true,
            }
        );
        assert_eq!(result.intent.unwrap().status, IntentStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_head_awaits() {
        let verifier = setup(|intent| FakeChain {
            head: None,
            ..chain_for(intent)
        })
        .await;
        let result = verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap();
        assert_eq!(result.confirmations(), 0);
        assert_eq!(result.outcome.reason(), "awaiting_confirmations");
    }

    #[tokio::test]
    async fn test_awaiting_then_confirmed() {
        let store = Arc::new(MemoryIntentStore::new());
        let intent = sample_intent("PAY-1", "alice");
        let early = Arc::new(FakeChain {
            head: Some(100),
            ..chain_for(&intent)
        });
        let late = Arc::new(chain_for(&intent));
        store.insert(intent).await.unwrap();

        let first = PaymentVerifier::new(Arc::clone(&store), early, VerifierOptions::default())
            .verify_at("alice", "PAY-1", TX, NOW)
            .await
            .unwrap();
        assert!(first.outcome.is_retryable());

        let second = PaymentVerifier::new(Arc::clone(&store), late, VerifierOptions::default())
            .verify_at("alice", "PAY-1", TX, NOW)
            .await
            .unwrap();
        assert_eq!(
            second.outcome,
            VerificationOutcome::Confirmed { confirmations: 3 }
        );
    }

    #[tokio::test]
    async fn test_concurrent_verifications_confirm_once() {
        let store = Arc::new(MemoryIntentStore::new());
        let intent = sample_intent("PAY-1", "alice");
        let chain = Arc::new(chain_for(&intent));
        store.insert(intent).await.unwrap();
        let verifier = Arc::new(PaymentVerifier::new(
            store,
            chain,
            VerifierOptions::default(),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let verifier = Arc::clone(&verifier);
            handles.push(tokio::spawn(async move {
                verifier.verify_at("alice", "PAY-1", TX, NOW).await.unwrap()
            }));
        }
        let mut fresh = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.success());
            if matches!(result.outcome, VerificationOutcome::Confirmed { .. }) {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);
    }

    #[test]
    fn test_outcome_classification() {
        let cases = [
            (VerificationOutcome::Confirmed { confirmations: 3 }, true, false),
            (VerificationOutcome::AlreadyConfirmed { confirmations: 3 }, true, false),
            (
                VerificationOutcome::AwaitingConfirmations {
                    confirmations: 1,
                    required: 2,
                    reverted: false,
                },
                false,
                true,
            ),
            (VerificationOutcome::NotFoundOnChain, false, true),
            (VerificationOutcome::Rejected(RejectionReason::Expired), false, false),
            (VerificationOutcome::Rejected(RejectionReason::RecipientMismatch), false, false),
            (VerificationOutcome::Rejected(RejectionReason::InsufficientAmount), false, false),
            (VerificationOutcome::Rejected(RejectionReason::MissingMemo), false, false),
        ];
        for (outcome, success, retryable) in cases {
            assert_eq!(outcome.is_success(), success, "{outcome:?}");
            assert_eq!(outcome.is_retryable(), retryable, "{outcome:?}");
        }
    }
}
