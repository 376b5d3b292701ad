//! handlers/inbound_handler.rs
//! Inbound-message webhook and the endpoints that hand those messages out.

use std::time::Duration;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::errors::CallbackError;
use crate::services::inbound_mailbox::InboundMailbox;

const DEFAULT_WAIT_MS: u64 = 10_000;
const MAX_WAIT_MS: u64 = 60_000;

#[derive(Deserialize)]
pub struct TakeQuery {
    timeout_ms: Option<u64>,
}

/// POST /webhooks/messages/inbound
pub async fn inbound_message_webhook(
    mailbox: web::Data<InboundMailbox>,
    body: web::Bytes,
) -> HttpResponse {
    match mailbox.deliver(&body).await {
        Ok(_) => HttpResponse::Ok().content_type("text/plain").body("OK"),
        Err(CallbackError::Rejected(reason)) => {
            log::warn!("Discarding inbound message: {}", reason);
            HttpResponse::BadRequest().content_type("text/plain").body(reason)
        }
        Err(CallbackError::Store(e)) => {
            HttpResponse::InternalServerError().content_type("text/plain").body(e.to_string())
        }
    }
}

/// GET /api/inbound
pub async fn list_inbound_endpoint(mailbox: web::Data<InboundMailbox>) -> HttpResponse {
    HttpResponse::Ok().json(mailbox.pending().await)
}

/// GET /api/inbound/{message_uuid}?timeout_ms=..
/// Collects the message, waiting for it if it has not arrived; 204 on timeout.
pub async fn take_inbound_endpoint(
    mailbox: web::Data<InboundMailbox>,
    path: web::Path<String>,
    query: web::Query<TakeQuery>,
) -> HttpResponse {
    let timeout = Duration::from_millis(query.timeout_ms.unwrap_or(DEFAULT_WAIT_MS).min(MAX_WAIT_MS));

    match mailbox.take(&path.into_inner(), timeout).await {
        Some(message) => HttpResponse::Ok().json(message),
        None => HttpResponse::NoContent().finish(),
    }
}
