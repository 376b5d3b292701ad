//! handlers/mod.rs
pub mod inbound_handler;
pub mod message_handler;
pub mod webhook_handler;
