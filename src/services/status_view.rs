//! services/status_view.rs
//! Read-only projection of the request store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::request_model::RequestRecord;
use crate::services::request_store::RequestStore;

const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Clone)]
pub struct StatusView {
    store: Arc<dyn RequestStore>,
}

impl StatusView {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// All records, oldest first; ties broken by local id.
    pub async fn list(&self) -> Result<Vec<RequestRecord>, StoreError> {
        let mut records = self.store.list().await?;
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.local_id.cmp(&b.local_id))
        });
        Ok(records)
    }

    pub async fn get(&self, local_id: Uuid) -> Result<RequestRecord, StoreError> {
        self.store.get(local_id).await
    }

    /// Waits until the record's `updated_at` is later than `since` (default:
    /// its value when the call starts). Returns `None` if `timeout` elapses first.
    pub async fn wait_for_update(
        &self,
        local_id: Uuid,
        since: Option<DateTime<Utc>>,
        timeout: Duration,
    ) -> Result<Option<RequestRecord>, StoreError> {
        let now = Instant::now();
        // Durations too large to add are treated as "wait for a long time".
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let since = match since {
            Some(since) => since,
            None => self.store.get(local_id).await?.updated_at,
        };

        loop {
            // Register before reading so a mutation in between is not missed.
            let notified = self.store.changes().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let record = self.store.get(local_id).await?;
            if record.updated_at > since {
                return Ok(Some(record));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}
