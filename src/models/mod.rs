//! models/mod.rs
//! Data shared between the services and the HTTP handlers.

pub mod callback_model;
pub mod inbound_model;
pub mod message_model;
pub mod request_model;
