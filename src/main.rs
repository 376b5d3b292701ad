use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::callback_router::CallbackRouter;
use crate::services::inbound_mailbox::InboundMailbox;
use crate::services::outbound_gateway::OutboundGateway;
use crate::services::provider_client::VonageMessagesClient;
use crate::services::request_store::{InMemoryRequestStore, RequestStore};
use crate::services::sqlite_request_store::SqliteRequestStore;
use crate::services::status_view::StatusView;

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_store(config: &AppConfig) -> Result<Arc<dyn RequestStore>> {
    match &config.store_url {
        Some(url) => {
            log::info!("Using SQLite request store at {}", url);
            let store = SqliteRequestStore::connect(url, config.store_max_connections)
                .await
                .with_context(|| format!("Could not open request store at {url}"))?;
            Ok(Arc::new(store))
        }
        None => {
            log::info!("Using in-memory request store");
            Ok(Arc::new(InMemoryRequestStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logger();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let store = setup_store(&config).await?;
    let provider = VonageMessagesClient::new(&config.provider)
        .context("Could not build the provider HTTP client")?;

    let gateway = OutboundGateway::new(store.clone(), Arc::new(provider));
    let router = CallbackRouter::new(store.clone());
    let view = StatusView::new(store);
    let sandbox_numbers = config.sandbox_numbers.clone();
    // Shared across workers, so built once outside the app factory.
    let inbound = web::Data::new(InboundMailbox::new(config.inbound_capacity));

    match &config.server_url {
        Some(server_url) => {
            log::info!(
                "Register {}{} as the message status webhook",
                server_url,
                app::MESSAGE_STATUS_ENDPOINT
            );
            log::info!(
                "Register {}{} as the inbound message webhook",
                server_url,
                app::INBOUND_MESSAGE_ENDPOINT
            );
        }
        None => log::warn!("No public server URL configured; provider webhooks need one"),
    }

    log::info!("Starting server on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(router.clone()))
            .app_data(web::Data::new(view.clone()))
            .app_data(web::Data::new(sandbox_numbers.clone()))
            .app_data(inbound.clone())
            .configure(app::init_app)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
