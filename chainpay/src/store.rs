//! Persistence of payment intents.
//!
//! Intents are append-only: they are inserted once and afterwards only their
//! status and observation fields change, always through a conditional update
//! that requires the stored intent to still be [`IntentStatus::Pending`]. That
//! condition is what keeps two concurrent verifications from both confirming
//! the same intent.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::StoreError;
use crate::intent::{IntentStatus, PaymentIntent};
use crate::timestamp::UnixTimestamp;

/// Durable holder of every [`PaymentIntent`].
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Inserts a new intent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateReference`] if the reference exists.
    async fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError>;

    /// Looks up an intent by reference, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage fails.
    async fn get(&self, reference: &str, owner_id: &str)
    -> Result<Option<PaymentIntent>, StoreError>;

    /// Moves a pending intent to [`IntentStatus::Expired`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StatusConflict`] if the intent is not pending.
    async fn expire(&self, reference: &str, owner_id: &str) -> Result<PaymentIntent, StoreError>;

    /// Records the latest observation of a pending intent's transaction
    /// without changing its status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StatusConflict`] if the intent is not pending.
    async fn record_observation(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
    ) -> Result<PaymentIntent, StoreError>;

    /// Moves a pending intent to [`IntentStatus::Confirmed`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StatusConflict`] if the intent is not pending.
    async fn confirm(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
        confirmed_at: UnixTimestamp,
    ) -> Result<PaymentIntent, StoreError>;
}

#[async_trait]
impl<T: IntentStore + ?Sized> IntentStore for Arc<T> {
    async fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError> {
        (**self).insert(intent).await
    }

    async fn get(
        &self,
        reference: &str,
        owner_id: &str,
    ) -> Result<Option<PaymentIntent>, StoreError> {
        (**self).get(reference, owner_id).await
    }

    async fn expire(&self, reference: &str, owner_id: &str) -> Result<PaymentIntent, StoreError> {
        (**self).expire(reference, owner_id).await
    }

    async fn record_observation(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
    ) -> Result<PaymentIntent, StoreError> {
        (**self)
            .record_observation(reference, owner_id, transaction_hash, confirmations)
            .await
    }

    async fn confirm(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
        confirmed_at: UnixTimestamp,
    ) -> Result<PaymentIntent, StoreError> {
        (**self)
            .confirm(reference, owner_id, transaction_hash, confirmations, confirmed_at)
            .await
    }
}

/// In-process intent store backed by a [`DashMap`].
///
/// Each update holds the shard lock of its reference for the whole
/// read-check-write, so updates to one intent are serialized while different
/// references proceed in parallel.
#[derive(Debug, Default)]
pub struct MemoryIntentStore {
    intents: DashMap<String, PaymentIntent>,
}

impl MemoryIntentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with existing intents.
    ///
    /// Later duplicates of a reference replace earlier ones.
    pub fn from_intents(intents: impl IntoIterator<Item = PaymentIntent>) -> Self {
        let map = intents
            .into_iter()
            .map(|intent| (intent.reference.clone(), intent))
            .collect();
        Self { intents: map }
    }

    /// Returns a copy of every stored intent, ordered by creation time.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PaymentIntent> {
        let mut all: Vec<PaymentIntent> = self.intents.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.reference.cmp(&b.reference))
        });
        all
    }

    /// Number of stored intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Returns `true` if an intent with this reference exists, for any owner.
    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.intents.contains_key(reference)
    }

    /// Returns the pending intent as `update` would leave it, without
    /// storing the result.
    ///
    /// Callers that persist elsewhere first and [`replace`](Self::replace)
    /// afterwards must serialize their updates themselves.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown reference or owner and
    /// [`StoreError::StatusConflict`] if the intent is not pending.
    pub fn preview_update(
        &self,
        reference: &str,
        owner_id: &str,
        update: impl FnOnce(&mut PaymentIntent),
    ) -> Result<PaymentIntent, StoreError> {
        let mut intent = self
            .intents
            .get(reference)
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::NotFound(reference.to_owned()))?;
        if intent.status != IntentStatus::Pending {
            return Err(StoreError::StatusConflict {
                current: intent.status,
            });
        }
        update(&mut intent);
        Ok(intent)
    }

    /// Inserts or overwrites an intent unconditionally.
    pub fn replace(&self, intent: PaymentIntent) {
        self.intents.insert(intent.reference.clone(), intent);
    }

    /// Applies `update` to a pending intent owned by `owner_id`.
    fn update_pending(
        &self,
        reference: &str,
        owner_id: &str,
        update: impl FnOnce(&mut PaymentIntent),
    ) -> Result<PaymentIntent, StoreError> {
        let mut entry = self
            .intents
            .get_mut(reference)
            .filter(|e| e.owner_id == owner_id)
            .ok_or_else(|| StoreError::NotFound(reference.to_owned()))?;
        if entry.status != IntentStatus::Pending {
            return Err(StoreError::StatusConflict {
                current: entry.status,
            });
        }
        update(entry.value_mut());
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError> {
        match self.intents.entry(intent.reference.clone()) {
            Entry::Occupied(e) => Err(StoreError::DuplicateReference(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(intent);
                Ok(())
            }
        }
    }

    async fn get(
        &self,
        reference: &str,
        owner_id: &str,
    ) -> Result<Option<PaymentIntent>, StoreError> {
        Ok(self
            .intents
            .get(reference)
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.value().clone()))
    }

    async fn expire(&self, reference: &str, owner_id: &str) -> Result<PaymentIntent, StoreError> {
        self.update_pending(reference, owner_id, |intent| {
            intent.status = IntentStatus::Expired;
        })
    }

    async fn record_observation(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
    ) -> Result<PaymentIntent, StoreError> {
        self.update_pending(reference, owner_id, |intent| {
            intent.transaction_hash = Some(transaction_hash.to_owned());
            intent.confirmations = confirmations;
        })
    }

    async fn confirm(
        &self,
        reference: &str,
        owner_id: &str,
        transaction_hash: &str,
        confirmations: u64,
        confirmed_at: UnixTimestamp,
    ) -> Result<PaymentIntent, StoreError> {
        self.update_pending(reference, owner_id, |intent| {
            intent.status = IntentStatus::Confirmed;
            intent.transaction_hash = Some(transaction_hash.to_owned());
            intent.confirmations = confirmations;
            intent.confirmed_at = Some(confirmed_at);
        })
    }
}
