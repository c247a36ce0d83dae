//! Durable intent store backed by a JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chainpay::error::StoreError;
use chainpay::intent::{IntentStatus, PaymentIntent};
use chainpay::store::{IntentStore, MemoryIntentStore};
use chainpay::timestamp::UnixTimestamp;
use tokio::sync::Mutex;

/// Keeps intents in memory and rewrites the whole file after every change.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash leaves either the old or the new contents. Changes
/// become visible in memory only after the file write succeeds, so a failed
/// write leaves both unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    inner: MemoryIntentStore,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing intents if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let intents: Vec<PaymentIntent> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %path.display(), intents = intents.len(), "Opened intent store");
        Ok(Self {
            inner: MemoryIntentStore::from_intents(intents),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Writes `intents` as the new file contents.
    async fn write(&self, intents: &[PaymentIntent]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(intents)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Persists `intent` alongside every other stored intent, then makes it
    /// visible in memory. Callers hold `write_lock`.
    async fn commit(&self, intent: PaymentIntent) -> Result<PaymentIntent, StoreError> {
        let mut all = self.inner.snapshot();
        match all.iter_mut().find(|i| i.reference == intent.reference) {
            Some(slot) => *slot = intent.clone(),
            None => all.push(intent.clone()),
        }
        if let Err(e) = self.write(&all).await {
            tracing::error!(reference = %intent.reference, error = %e, "Failed to persist intent");
            return Err(e);
        }
        self.inner.replace(intent.clone());
        Ok(intent)
    }

    async fn update_pending(
        &self,
        reference: &str,
        owner_id: &str,
        update: impl FnOnce(&mut PaymentIntent) + Send,
    ) -> Result<PaymentIntent, StoreError> {
        let _guard = self.write_lock.lock().await;
        let updated = self.inner.preview_update(reference, owner_id, update)?;
        self.commit(updated).await
    }
}

#[async_trait]
impl IntentStore for JsonFileStore {
    async fn insert(&self, intent: PaymentIntent) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.inner.contains(&intent.reference) {
            return Err(StoreError::DuplicateReference(intent.reference));
        }
        self.commit(intent).await.map(|_| ())
    }

    async fn get(
        &self,
        reference: &str,
        owner_id: &str,
    ) -> Result<Option<PaymentIntent>, StoreError> {
        self.inner.get(reference, owner_id).await
    }

    async fn expire(&self, reference: &str, owner_id: &str) -> Result<PaymentIntent, StoreError> {
        self.update_pending(reference, owner_id, |intent| {
            intent.status = IntentStatus::Expired;
        })
        .await
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
        self.update_pending(reference, owner_id, |intent| {
            intent.status = IntentStatus::Confirmed;
            intent.transaction_hash = Some(transaction_hash.to_owned());
            intent.confirmations = confirmations;
            intent.confirmed_at = Some(confirmed_at);
        })
        .await
    }
}
