//! logger.rs
//! Logger setup using env_logger.

pub fn init_logger() {
    // RUST_LOG wins when set; otherwise service logs at info, actix at warn.
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,actix_server=warn".to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}
