//! handlers/message_handler.rs
//! Endpoints for sending messages and reading their delivery status.

use std::time::Duration;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::message_model::{
    Channel, ListMessagesResponse, SandboxNumbers, SendMessageRequest, SendMessageResponse,
};
use crate::services::outbound_gateway::OutboundGateway;
use crate::services::provider_client::ProviderRoute;
use crate::services::status_view::StatusView;

const DEFAULT_WAIT_MS: u64 = 10_000;
const MAX_WAIT_MS: u64 = 60_000;

#[derive(Deserialize)]
pub struct WaitQuery {
    since: Option<DateTime<Utc>>,
    timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct TypesQuery {
    channel: Channel,
}

fn store_error_response(e: &StoreError) -> HttpResponse {
    match e {
        StoreError::NotFound(_) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Message not found"
        })),
        other => {
            log::error!("Store error: {}", other);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "Internal server error",
                "details": other.to_string()
            }))
        }
    }
}

fn parse_local_id(raw: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "Message not found"
        }))
    })
}

/// POST /api/messages
pub async fn send_message_endpoint(
    gateway: web::Data<OutboundGateway>,
    view: web::Data<StatusView>,
    body: web::Json<SendMessageRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    let payload = match req.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Rejected send request: {}", e);
            return HttpResponse::BadRequest().json(json!({
                "success": false,
                "error": e.to_string()
            }));
        }
    };

    let route = if req.sandbox {
        ProviderRoute::Sandbox
    } else {
        ProviderRoute::Regular
    };

    let local_id = match gateway.send_via(payload, route).await {
        Ok(local_id) => local_id,
        Err(e) => return store_error_response(&e),
    };

    // The provider outcome is already recorded; report what the store holds now.
    let status = match view.get(local_id).await {
        Ok(record) => record.status,
        Err(e) => return store_error_response(&e),
    };

    HttpResponse::Accepted().json(SendMessageResponse {
        success: true,
        local_id,
        status,
    })
}

/// GET /api/messages
pub async fn list_messages_endpoint(view: web::Data<StatusView>) -> HttpResponse {
    match view.list().await {
        Ok(items) => HttpResponse::Ok().json(ListMessagesResponse {
            total: items.len(),
            items,
        }),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/messages/{id}
pub async fn get_message_endpoint(
    view: web::Data<StatusView>,
    path: web::Path<String>,
) -> HttpResponse {
    let local_id = match parse_local_id(&path.into_inner()) {
        Ok(local_id) => local_id,
        Err(resp) => return resp,
    };

    match view.get(local_id).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/messages/{id}/status?since=..&timeout_ms=..
/// Long-polls for the next status update; 204 when nothing changed in time.
pub async fn wait_for_status_endpoint(
    view: web::Data<StatusView>,
    path: web::Path<String>,
    query: web::Query<WaitQuery>,
) -> HttpResponse {
    let local_id = match parse_local_id(&path.into_inner()) {
        Ok(local_id) => local_id,
        Err(resp) => return resp,
    };
    let timeout = Duration::from_millis(query.timeout_ms.unwrap_or(DEFAULT_WAIT_MS).min(MAX_WAIT_MS));

    match view.wait_for_update(local_id, query.since, timeout).await {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NoContent().finish(),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/messages/types?channel=..
pub async fn message_types_endpoint(query: web::Query<TypesQuery>) -> HttpResponse {
    HttpResponse::Ok().json(query.channel.supported_message_types())
}

/// GET /api/messages/sandbox-numbers
pub async fn sandbox_numbers_endpoint(numbers: web::Data<SandboxNumbers>) -> HttpResponse {
    HttpResponse::Ok().json(numbers.get_ref())
}
