//! handlers/webhook_handler.rs
//! Provider webhooks.

use actix_web::{web, HttpResponse};

use crate::errors::CallbackError;
use crate::services::callback_router::CallbackRouter;

/// POST /webhooks/messages/status
pub async fn message_status_webhook(
    router: web::Data<CallbackRouter>,
    body: web::Bytes,
) -> HttpResponse {
    match router.handle(&body).await {
        Ok(outcome) => {
            log::debug!("Status callback handled: {:?}", outcome);
            HttpResponse::Ok().content_type("text/plain").body("OK")
        }
        Err(CallbackError::Rejected(reason)) => {
            log::warn!("Discarding status callback: {}", reason);
            HttpResponse::BadRequest().content_type("text/plain").body(reason)
        }
        // 5xx so the provider redelivers once the store is back.
        Err(CallbackError::Store(e)) => {
            HttpResponse::InternalServerError().content_type("text/plain").body(e.to_string())
        }
    }
}
