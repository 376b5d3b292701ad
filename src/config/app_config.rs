//! config/app_config.rs
//! Service configuration, read from the environment (and `.env`).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::message_model::SandboxNumbers;
use crate::services::inbound_mailbox::DEFAULT_INBOUND_CAPACITY;

pub const DEFAULT_MESSAGES_URL: &str = "https://api.nexmo.com/v1/messages";
pub const DEFAULT_SANDBOX_URL: &str = "https://messages-sandbox.nexmo.com/v1/messages";

/// Provider credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_secret: String,
    pub messages_url: String,
    pub sandbox_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL the provider should call back on, if known.
    pub server_url: Option<String>,
    pub provider: ProviderConfig,
    /// `None` keeps requests in memory.
    pub store_url: Option<String>,
    pub store_max_connections: u32,
    /// Inbound messages held before the oldest uncollected one is dropped.
    pub inbound_capacity: usize,
    pub sandbox_numbers: SandboxNumbers,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let var_or = |primary: &str, fallback: &str| var(primary).or_else(|| var(fallback));

        let api_key = var_or("VONAGE_API_KEY", "VCR_API_ACCOUNT_ID")
            .ok_or_else(|| anyhow!("VONAGE_API_KEY is not set"))?;
        let api_secret = var_or("VONAGE_API_SECRET", "VCR_API_ACCOUNT_SECRET")
            .ok_or_else(|| anyhow!("VONAGE_API_SECRET is not set"))?;

        let timeout_secs = match var("VONAGE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("VONAGE_TIMEOUT_SECS is not a number: '{raw}'"))?,
            None => 10,
        };

        let port = match var_or("VCR_PORT", "PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid port: '{raw}'"))?,
            None => 8080,
        };

        let store_max_connections = match var("REQUEST_STORE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().with_context(|| {
                format!("REQUEST_STORE_MAX_CONNECTIONS is not a number: '{raw}'")
            })?,
            None => 5,
        };

        let inbound_capacity = match var("INBOUND_MAILBOX_CAPACITY") {
            Some(raw) => raw.parse().with_context(|| {
                format!("INBOUND_MAILBOX_CAPACITY is not a number: '{raw}'")
            })?,
            None => DEFAULT_INBOUND_CAPACITY,
        };

        Ok(AppConfig {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            server_url: var_or("VONAGE_SERVER_URL", "VCR_INSTANCE_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            provider: ProviderConfig {
                api_key,
                api_secret,
                messages_url: var("VONAGE_MESSAGES_URL")
                    .unwrap_or_else(|| DEFAULT_MESSAGES_URL.to_string()),
                sandbox_url: var("VONAGE_MESSAGES_SANDBOX_URL")
                    .unwrap_or_else(|| DEFAULT_SANDBOX_URL.to_string()),
                timeout_secs,
            },
            store_url: var("REQUEST_STORE_URL"),
            store_max_connections,
            inbound_capacity,
            sandbox_numbers: SandboxNumbers {
                whatsapp: var("VONAGE_WHATSAPP_NUMBER"),
                viber: var("VONAGE_VIBER_ID"),
                messenger: var("VONAGE_MESSENGER_ID"),
            },
        })
    }
}
