//! services/request_store.rs
//! Storage of outbound request records, plus the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Notify, RwLock};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::request_model::{RequestRecord, RequestStatus, StatusChange};

/// Keyed storage of request records and their lifecycle state.
///
/// Implementations serialize mutations per record and notify
/// [`RequestStore::changes`] after every mutation.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Stores a new `Pending` record and returns its local id.
    async fn create(&self, payload: Value) -> Result<Uuid, StoreError>;

    /// Binds the provider id to a `Pending` record and advances it to `Sent`.
    async fn attach_provider_id(
        &self,
        local_id: Uuid,
        provider_id: &str,
    ) -> Result<RequestRecord, StoreError>;

    /// Moves a record to `Failed`, recording `reason`.
    async fn mark_failed(&self, local_id: Uuid, reason: &str) -> Result<RequestRecord, StoreError>;

    /// Applies a provider-reported status change to the record holding `provider_id`.
    async fn update_status(
        &self,
        provider_id: &str,
        change: StatusChange,
    ) -> Result<RequestRecord, StoreError>;

    async fn get(&self, local_id: Uuid) -> Result<RequestRecord, StoreError>;

    /// Every record, in no particular order.
    async fn list(&self) -> Result<Vec<RequestRecord>, StoreError>;

    /// Signal notified after each mutation.
    fn changes(&self) -> &Notify;
}

#[derive(Debug, Clone, Copy)]
struct ProviderBinding {
    local_id: Uuid,
    /// False once the bound record has failed; the id may then be reused.
    active: bool,
}

/// Process-local store. Each record sits behind its own mutex; the provider id
/// index has a separate one. Locks are always taken record first, then index.
#[derive(Default)]
pub struct InMemoryRequestStore {
    records: RwLock<HashMap<Uuid, Arc<Mutex<RequestRecord>>>>,
    by_provider_id: Mutex<HashMap<String, ProviderBinding>>,
    changes: Notify,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, local_id: Uuid) -> Result<Arc<Mutex<RequestRecord>>, StoreError> {
        self.records
            .read()
            .await
            .get(&local_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(local_id.to_string()))
    }

    async fn release_provider_id(&self, provider_id: &str, local_id: Uuid) {
        let mut index = self.by_provider_id.lock().await;
        if let Some(binding) = index.get_mut(provider_id) {
            if binding.local_id == local_id {
                binding.active = false;
            }
        }
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn create(&self, payload: Value) -> Result<Uuid, StoreError> {
        let local_id = Uuid::new_v4();
        let record = RequestRecord::new(local_id, payload);
        self.records
            .write()
            .await
            .insert(local_id, Arc::new(Mutex::new(record)));
        self.changes.notify_waiters();
        Ok(local_id)
    }

    async fn attach_provider_id(
        &self,
        local_id: Uuid,
        provider_id: &str,
    ) -> Result<RequestRecord, StoreError> {
        let slot = self.slot(local_id).await?;
        let mut record = slot.lock().await;

        if record.status != RequestStatus::Pending || record.provider_id.is_some() {
            return Err(StoreError::InvalidTransition {
                local_id,
                from: record.status,
                to: RequestStatus::Sent,
            });
        }

        {
            let mut index = self.by_provider_id.lock().await;
            if let Some(existing) = index.get(provider_id) {
                if existing.active && existing.local_id != local_id {
                    return Err(StoreError::DuplicateProviderId(provider_id.to_owned()));
                }
            }
            index.insert(
                provider_id.to_owned(),
                ProviderBinding {
                    local_id,
                    active: true,
                },
            );
        }

        record.attach_provider_id(provider_id)?;
        let snapshot = record.clone();
        drop(record);

        self.changes.notify_waiters();
        Ok(snapshot)
    }

    async fn mark_failed(&self, local_id: Uuid, reason: &str) -> Result<RequestRecord, StoreError> {
        let slot = self.slot(local_id).await?;
        let mut record = slot.lock().await;

        let change = StatusChange::new(RequestStatus::Failed).with_reason(reason);
        if record.apply(&change)? {
            if let Some(provider_id) = record.provider_id.clone() {
                self.release_provider_id(&provider_id, local_id).await;
            }
            self.changes.notify_waiters();
        }
        Ok(record.clone())
    }

    async fn update_status(
        &self,
        provider_id: &str,
        change: StatusChange,
    ) -> Result<RequestRecord, StoreError> {
        let local_id = self
            .by_provider_id
            .lock()
            .await
            .get(provider_id)
            .map(|binding| binding.local_id)
            .ok_or_else(|| StoreError::NotFound(provider_id.to_owned()))?;

        let slot = self.slot(local_id).await?;
        let mut record = slot.lock().await;

        if record.apply(&change)? {
            if record.status == RequestStatus::Failed {
                self.release_provider_id(provider_id, local_id).await;
            }
            self.changes.notify_waiters();
        }
        Ok(record.clone())
    }

    async fn get(&self, local_id: Uuid) -> Result<RequestRecord, StoreError> {
        let slot = self.slot(local_id).await?;
        let record = slot.lock().await;
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<RequestRecord>, StoreError> {
        let slots: Vec<_> = self.records.read().await.values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            records.push(slot.lock().await.clone());
        }
        Ok(records)
    }

    fn changes(&self) -> &Notify {
        &self.changes
    }
}
