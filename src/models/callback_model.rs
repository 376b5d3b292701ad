//! models/callback_model.rs
//! Provider status callback payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::request_model::{RequestStatus, StatusChange, Usage};

/// Status webhook body. Only the fields used for correlation are modelled;
/// anything else the provider adds is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusCallback {
    pub message_uuid: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<String>,
    pub error: Option<CallbackErrorDetail>,
    /// Kept loose: a malformed `usage` must not cost us the status.
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackErrorDetail {
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl CallbackErrorDetail {
    fn describe(&self) -> Option<String> {
        match (self.title.as_deref(), self.detail.as_deref()) {
            (Some(title), Some(detail)) => Some(format!("{title}: {detail}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
            (None, None) => None,
        }
    }
}

/// Provider timestamps are RFC 3339; anything else is dropped.
pub fn parse_provider_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            log::debug!("(parse_provider_timestamp) Ignoring '{}': {}", raw, e);
            None
        }
    }
}

/// Reads `{"currency": "EUR", "price": "0.0333"}`, accepting a numeric price.
pub fn usage_from_value(value: &Value) -> Option<Usage> {
    let currency = value
        .get("currency")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let price = match value.get("price") {
        Some(Value::String(price)) => Some(price.clone()),
        Some(Value::Number(price)) => Some(price.to_string()),
        _ => None,
    };
    if currency.is_none() && price.is_none() {
        return None;
    }
    Some(Usage { currency, price })
}

/// Maps the provider's status vocabulary onto [`RequestStatus`].
/// Unrecognized strings become `Unknown` so vocabulary drift never drops a callback.
pub fn map_provider_status(raw: &str) -> RequestStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "submitted" => RequestStatus::Sent,
        "delivered" | "read" => RequestStatus::Delivered,
        "rejected" | "undeliverable" | "failed" => RequestStatus::Failed,
        _ => RequestStatus::Unknown,
    }
}

impl StatusCallback {
    /// The status change this callback asks for, keyed by the raw provider status.
    pub fn to_change(&self, raw_status: &str) -> StatusChange {
        let mut change = StatusChange::new(map_provider_status(raw_status))
            .with_provider_status(raw_status.trim());
        if let Some(reason) = self.error.as_ref().and_then(CallbackErrorDetail::describe) {
            change = change.with_reason(reason);
        }
        if let Some(at) = self.timestamp.as_deref().and_then(parse_provider_timestamp) {
            change = change.with_provider_timestamp(at);
        }
        if let Some(usage) = self.usage.as_ref().and_then(usage_from_value) {
            change = change.with_usage(usage);
        }
        change
    }
}
