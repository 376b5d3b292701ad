//! models/inbound_model.rs
//! Messages users send to our numbers and ids, as delivered by the inbound webhook.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::CallbackError;
use crate::models::callback_model::{parse_provider_timestamp, usage_from_value};
use crate::models::request_model::Usage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundMessage {
    pub message_uuid: String,
    pub channel: Option<String>,
    pub message_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub text: Option<String>,
    pub provider_timestamp: Option<DateTime<Utc>>,
    pub usage: Option<Usage>,
    pub received_at: DateTime<Utc>,
    /// The webhook body as received, media and channel-specific fields included.
    pub body: Value,
}

fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl InboundMessage {
    /// Parses a raw inbound webhook body. Only `message_uuid` is required.
    pub fn parse(raw: &[u8]) -> Result<Self, CallbackError> {
        let body: Value = serde_json::from_slice(raw)
            .map_err(|e| CallbackError::Rejected(format!("invalid JSON: {e}")))?;
        if !body.is_object() {
            return Err(CallbackError::Rejected(
                "inbound message is not a JSON object".to_string(),
            ));
        }
        let message_uuid = str_field(&body, "message_uuid")
            .ok_or_else(|| CallbackError::Rejected("missing message_uuid".to_string()))?;

        Ok(InboundMessage {
            message_uuid,
            channel: str_field(&body, "channel"),
            message_type: str_field(&body, "message_type"),
            from: str_field(&body, "from"),
            to: str_field(&body, "to"),
            text: str_field(&body, "text"),
            provider_timestamp: body
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(parse_provider_timestamp),
            usage: body.get("usage").and_then(usage_from_value),
            received_at: Utc::now(),
            body,
        })
    }
}
