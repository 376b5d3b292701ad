//! app.rs
use crate::handlers::{inbound_handler, message_handler, webhook_handler};
use actix_web::web;

pub const MESSAGE_STATUS_ENDPOINT: &str = "/webhooks/messages/status";
pub const INBOUND_MESSAGE_ENDPOINT: &str = "/webhooks/messages/inbound";

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/messages")
                    .route("", web::post().to(message_handler::send_message_endpoint))
                    .route("", web::get().to(message_handler::list_messages_endpoint))
                    // Fixed segments before `/{id}` so they are not taken for ids.
                    .route(
                        "/types",
                        web::get().to(message_handler::message_types_endpoint),
                    )
                    .route(
                        "/sandbox-numbers",
                        web::get().to(message_handler::sandbox_numbers_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(message_handler::get_message_endpoint),
                    )
                    .route(
                        "/{id}/status",
                        web::get().to(message_handler::wait_for_status_endpoint),
                    ),
            )
            .service(
                web::scope("/inbound")
                    .route("", web::get().to(inbound_handler::list_inbound_endpoint))
                    .route(
                        "/{message_uuid}",
                        web::get().to(inbound_handler::take_inbound_endpoint),
                    ),
            ),
    )
    .route(
        MESSAGE_STATUS_ENDPOINT,
        web::post().to(webhook_handler::message_status_webhook),
    )
    .route(
        INBOUND_MESSAGE_ENDPOINT,
        web::post().to(inbound_handler::inbound_message_webhook),
    );
}
