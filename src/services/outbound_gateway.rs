//! services/outbound_gateway.rs
//! Sends messages through the provider and records each attempt in the store.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::services::provider_client::{MessagingProvider, ProviderRoute};
use crate::services::request_store::RequestStore;

#[derive(Clone)]
pub struct OutboundGateway {
    store: Arc<dyn RequestStore>,
    provider: Arc<dyn MessagingProvider>,
}

impl OutboundGateway {
    pub fn new(store: Arc<dyn RequestStore>, provider: Arc<dyn MessagingProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn send(&self, payload: Value) -> Result<Uuid, StoreError> {
        self.send_via(payload, ProviderRoute::Regular).await
    }

    /// Records the request, then calls the provider without holding any store
    /// lock. Provider failures, and failures to store the provider id, end up as
    /// a `Failed` record, never as an error: only a failure to create the
    /// record is returned to the caller.
    pub async fn send_via(&self, payload: Value, route: ProviderRoute) -> Result<Uuid, StoreError> {
        let local_id = self.store.create(payload.clone()).await?;
        log::info!("(send_via) Created request {} ({:?})", local_id, route);

        let provider_id = match self.provider.send_message(&payload, route).await {
            Ok(provider_id) => provider_id,
            Err(e) => {
                log::warn!("(send_via) Provider call failed for {}: {}", local_id, e);
                self.record_failure(local_id, &e.to_string()).await;
                return Ok(local_id);
            }
        };

        match self.store.attach_provider_id(local_id, &provider_id).await {
            Ok(_) => log::info!(
                "(send_via) Request {} sent, provider id {}",
                local_id,
                provider_id
            ),
            Err(e @ StoreError::DuplicateProviderId(_)) => {
                log::error!("(send_via) Request {}: {}", local_id, e);
                self.record_failure(local_id, &e.to_string()).await;
            }
            Err(e) => {
                log::error!(
                    "(send_via) Could not attach provider id {} to {}: {}",
                    provider_id,
                    local_id,
                    e
                );
                let reason = format!(
                    "provider accepted as {provider_id} but the id could not be stored: {e}"
                );
                self.record_failure(local_id, &reason).await;
            }
        }

        Ok(local_id)
    }

    async fn record_failure(&self, local_id: Uuid, reason: &str) {
        if let Err(e) = self.store.mark_failed(local_id, reason).await {
            log::error!(
                "(record_failure) Could not mark request {} as failed: {}",
                local_id,
                e
            );
        }
    }
}
