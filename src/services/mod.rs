//! services/mod.rs
//! Request tracking, provider access, callback correlation and inbound messages.

pub mod callback_router;
pub mod inbound_mailbox;
pub mod outbound_gateway;
pub mod provider_client;
pub mod request_store;
pub mod sqlite_request_store;
pub mod status_view;
