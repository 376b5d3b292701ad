//! errors.rs
//! Error types shared by the store, the provider client and the callback router.

use thiserror::Error;
use uuid::Uuid;

use crate::models::message_model::{Channel, MessageType};
use crate::models::request_model::RequestStatus;

/// Failures reported by a [`crate::services::request_store::RequestStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matches the given local or provider id.
    #[error("request not found: {0}")]
    NotFound(String),

    /// The requested status change is not allowed by the request lifecycle.
    /// This is a logic error; retrying will not help.
    #[error("invalid transition for request {local_id}: {from} -> {to}")]
    InvalidTransition {
        local_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Another non-failed request already holds this provider id.
    #[error("provider id '{0}' is already attached to another request")]
    DuplicateProviderId(String),

    #[error("storage backend failure: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("storage migration failure: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("payload serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded back into a record.
    #[error("stored request is corrupt: {0}")]
    Corrupt(String),
}

/// Failures talking to the external messaging provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected the message ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("provider response was not understood: {0}")]
    InvalidResponse(String),
}

/// Failures handling an inbound status callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The event is structurally malformed and was discarded.
    #[error("malformed status callback: {0}")]
    Rejected(String),

    /// The store could not apply the event; the provider should retry.
    #[error(transparent)]
    Store(StoreError),
}

/// A send request that cannot be turned into a provider payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidMessage {
    #[error("channel '{channel}' does not support message type '{message_type}'")]
    UnsupportedType {
        channel: Channel,
        message_type: MessageType,
    },

    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}
