//! models/request_model.rs
//! Outbound request records and their delivery lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;

/// Delivery state of an outbound request.
///
/// `Pending -> Sent -> {Delivered, Failed, Unknown}`, plus `Pending -> Failed`
/// when the provider call itself fails. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Unknown,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Sent => "sent",
            RequestStatus::Delivered => "delivered",
            RequestStatus::Failed => "failed",
            RequestStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Delivered | RequestStatus::Failed)
    }

    /// Whether the lifecycle graph has an edge from `self` to `next`.
    /// Self-loops are not edges; see [`RequestRecord::apply`].
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Sent, Unknown)
                | (Unknown, Delivered)
                | (Unknown, Failed)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "sent" => Ok(RequestStatus::Sent),
            "delivered" => Ok(RequestStatus::Delivered),
            "failed" => Ok(RequestStatus::Failed),
            "unknown" => Ok(RequestStatus::Unknown),
            other => Err(StoreError::Corrupt(format!("unrecognized status '{other}'"))),
        }
    }
}

/// What the provider charged for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub currency: Option<String>,
    pub price: Option<String>,
}

/// A status change requested by the gateway or a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: RequestStatus,
    /// Raw status string as reported by the provider.
    pub provider_status: Option<String>,
    pub reason: Option<String>,
    /// When the provider says the status change happened.
    pub provider_timestamp: Option<DateTime<Utc>>,
    pub usage: Option<Usage>,
}

impl StatusChange {
    pub fn new(status: RequestStatus) -> Self {
        Self {
            status,
            provider_status: None,
            reason: None,
            provider_timestamp: None,
            usage: None,
        }
    }

    pub fn with_provider_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.provider_timestamp = Some(at);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_provider_status(mut self, provider_status: impl Into<String>) -> Self {
        self.provider_status = Some(provider_status.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub local_id: Uuid,
    pub provider_id: Option<String>,
    pub status: RequestStatus,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub provider_status: Option<String>,
    /// Provider-side time of the latest status report.
    pub provider_timestamp: Option<DateTime<Utc>>,
    pub usage: Option<Usage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestRecord {
    pub fn new(local_id: Uuid, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            local_id,
            provider_id: None,
            status: RequestStatus::Pending,
            payload,
            error_message: None,
            provider_status: None,
            provider_timestamp: None,
            usage: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `change` in place.
    ///
    /// Returns `Ok(false)` when the record already sits in the requested
    /// non-terminal state (nothing is mutated), `Ok(true)` when the record
    /// changed.
    pub fn apply(&mut self, change: &StatusChange) -> Result<bool, StoreError> {
        if self.status == change.status && !self.status.is_terminal() {
            return Ok(false);
        }
        if !self.status.can_transition_to(change.status) {
            return Err(StoreError::InvalidTransition {
                local_id: self.local_id,
                from: self.status,
                to: change.status,
            });
        }

        self.status = change.status;
        if let Some(provider_status) = &change.provider_status {
            self.provider_status = Some(provider_status.clone());
        }
        if let Some(reason) = &change.reason {
            self.error_message = Some(reason.clone());
        }
        if let Some(at) = change.provider_timestamp {
            self.provider_timestamp = Some(at);
        }
        if let Some(usage) = &change.usage {
            self.usage = Some(usage.clone());
        }
        self.touch();
        Ok(true)
    }

    /// Binds the provider id and advances `Pending -> Sent` in one step.
    pub fn attach_provider_id(&mut self, provider_id: &str) -> Result<(), StoreError> {
        if self.status != RequestStatus::Pending || self.provider_id.is_some() {
            return Err(StoreError::InvalidTransition {
                local_id: self.local_id,
                from: self.status,
                to: RequestStatus::Sent,
            });
        }
        self.provider_id = Some(provider_id.to_owned());
        self.status = RequestStatus::Sent;
        self.touch();
        Ok(())
    }

    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }
}
