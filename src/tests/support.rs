//! tests/support.rs
//! Test doubles shared by the service and handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::errors::{ProviderError, StoreError};
use crate::models::request_model::{RequestRecord, StatusChange};
use crate::services::provider_client::{MessagingProvider, ProviderRoute};
use crate::services::request_store::{InMemoryRequestStore, RequestStore};

pub enum Behavior {
    /// Always answers with the same provider id.
    Accept(String),
    /// Answers `msg-0`, `msg-1`, ...
    AcceptSequential,
    Reject { status: u16, detail: String },
    InvalidResponse,
}

pub struct FakeProvider {
    behavior: Behavior,
    counter: AtomicUsize,
    pub calls: Mutex<Vec<(Value, ProviderRoute)>>,
}

impl FakeProvider {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting(provider_id: &str) -> Arc<Self> {
        Self::new(Behavior::Accept(provider_id.to_string()))
    }

    pub fn sequential() -> Arc<Self> {
        Self::new(Behavior::AcceptSequential)
    }

    pub fn rejecting(status: u16, detail: &str) -> Arc<Self> {
        Self::new(Behavior::Reject {
            status,
            detail: detail.to_string(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingProvider for FakeProvider {
    async fn send_message(
        &self,
        payload: &Value,
        route: ProviderRoute,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push((payload.clone(), route));
        match &self.behavior {
            Behavior::Accept(id) => Ok(id.clone()),
            Behavior::AcceptSequential => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("msg-{n}"))
            }
            Behavior::Reject { status, detail } => Err(ProviderError::Rejected {
                status: *status,
                detail: detail.clone(),
            }),
            Behavior::InvalidResponse => {
                Err(ProviderError::InvalidResponse("not json".to_string()))
            }
        }
    }
}

/// Reads the store from inside the provider call. If the gateway held a
/// store lock across the call, the read would hang and the timeout would fire.
pub struct StoreProbingProvider {
    pub store: Arc<dyn RequestStore>,
    pub seen_pending: Mutex<Vec<bool>>,
}

#[async_trait]
impl MessagingProvider for StoreProbingProvider {
    async fn send_message(
        &self,
        _payload: &Value,
        _route: ProviderRoute,
    ) -> Result<String, ProviderError> {
        let records = tokio::time::timeout(Duration::from_secs(2), self.store.list())
            .await
            .expect("store was locked during the provider call")
            .expect("list failed");
        let all_pending = records
            .iter()
            .all(|r| r.status == crate::models::request_model::RequestStatus::Pending);
        self.seen_pending.lock().unwrap().push(all_pending);
        Ok("probe-1".to_string())
    }
}

/// In-memory store whose `attach_provider_id` always fails with a backend error.
#[derive(Default)]
pub struct AttachFailingStore {
    inner: InMemoryRequestStore,
}

#[async_trait]
impl RequestStore for AttachFailingStore {
    async fn create(&self, payload: Value) -> Result<Uuid, StoreError> {
        self.inner.create(payload).await
    }

    async fn attach_provider_id(
        &self,
        _local_id: Uuid,
        _provider_id: &str,
    ) -> Result<RequestRecord, StoreError> {
        Err(StoreError::Backend(sqlx::Error::PoolTimedOut))
    }

    async fn mark_failed(&self, local_id: Uuid, reason: &str) -> Result<RequestRecord, StoreError> {
        self.inner.mark_failed(local_id, reason).await
    }

    async fn update_status(
        &self,
        provider_id: &str,
        change: StatusChange,
    ) -> Result<RequestRecord, StoreError> {
        self.inner.update_status(provider_id, change).await
    }

    async fn get(&self, local_id: Uuid) -> Result<RequestRecord, StoreError> {
        self.inner.get(local_id).await
    }

    async fn list(&self) -> Result<Vec<RequestRecord>, StoreError> {
        self.inner.list().await
    }

    fn changes(&self) -> &Notify {
        self.inner.changes()
    }
}
