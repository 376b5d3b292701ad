//! services/callback_router.rs
//! Correlates provider status callbacks with stored requests.

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::{CallbackError, StoreError};
use crate::models::callback_model::StatusCallback;
use crate::models::request_model::RequestStatus;
use crate::services::request_store::RequestStore;

/// What happened to an accepted callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The record now has `status` (possibly unchanged, for a non-terminal replay).
    Applied { local_id: Uuid, status: RequestStatus },
    /// No record holds this provider id, e.g. after a restart.
    Unmatched,
    /// The transition was not allowed, typically a replayed or late callback.
    Ignored,
}

#[derive(Clone)]
pub struct CallbackRouter {
    store: Arc<dyn RequestStore>,
}

impl CallbackRouter {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// Handles one raw webhook body. Malformed events are rejected without
    /// touching the store; unknown ids and disallowed transitions are
    /// acknowledged so the provider stops retrying.
    pub async fn handle(&self, raw_event: &[u8]) -> Result<CallbackOutcome, CallbackError> {
        let callback: StatusCallback = serde_json::from_slice(raw_event)
            .map_err(|e| CallbackError::Rejected(format!("invalid JSON: {e}")))?;

        let provider_id = callback
            .message_uuid
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CallbackError::Rejected("missing message_uuid".to_string()))?;
        let raw_status = callback
            .status
            .as_deref()
            .filter(|status| !status.trim().is_empty())
            .ok_or_else(|| CallbackError::Rejected("missing status".to_string()))?;

        let change = callback.to_change(raw_status);
        log::info!(
            "(handle) Callback for {}: '{}' -> {} (at {})",
            provider_id,
            raw_status,
            change.status,
            callback.timestamp.as_deref().unwrap_or("n/a")
        );

        match self.store.update_status(provider_id, change).await {
            Ok(record) => Ok(CallbackOutcome::Applied {
                local_id: record.local_id,
                status: record.status,
            }),
            Err(StoreError::NotFound(_)) => {
                log::info!("(handle) No request holds provider id {}, ignoring", provider_id);
                Ok(CallbackOutcome::Unmatched)
            }
            Err(e @ StoreError::InvalidTransition { .. }) => {
                log::debug!("(handle) Ignoring callback for {}: {}", provider_id, e);
                Ok(CallbackOutcome::Ignored)
            }
            Err(e) => {
                log::error!("(handle) Could not apply callback for {}: {}", provider_id, e);
                Err(CallbackError::Store(e))
            }
        }
    }
}
