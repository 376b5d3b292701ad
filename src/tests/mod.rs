//! tests/mod.rs

mod support;

mod message_model_tests;
mod store_tests;
