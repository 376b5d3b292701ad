//! services/provider_client.rs
//! HTTP client for the provider's send-message API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::app_config::ProviderConfig;
use crate::errors::ProviderError;

/// Which provider endpoint a message goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderRoute {
    #[default]
    Regular,
    Sandbox,
}

/// The external send-message API. Returns the provider-assigned message id.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(
        &self,
        payload: &Value,
        route: ProviderRoute,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct AcceptedMessage {
    message_uuid: String,
}

/// Problem-details body the provider returns on rejection.
#[derive(Debug, Default, Deserialize)]
struct ProblemDetails {
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Clone)]
pub struct VonageMessagesClient {
    http_client: Client,
    messages_url: String,
    sandbox_url: String,
    api_key: String,
    api_secret: String,
}

impl VonageMessagesClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            messages_url: config.messages_url.clone(),
            sandbox_url: config.sandbox_url.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, route: ProviderRoute) -> &str {
        match route {
            ProviderRoute::Regular => &self.messages_url,
            ProviderRoute::Sandbox => &self.sandbox_url,
        }
    }
}

#[async_trait]
impl MessagingProvider for VonageMessagesClient {
    async fn send_message(
        &self,
        payload: &Value,
        route: ProviderRoute,
    ) -> Result<String, ProviderError> {
        let url = self.endpoint(route);
        log::info!("(send_message) POST {} ({:?})", url, route);

        let resp = self
            .http_client
            .post(url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let problem: ProblemDetails = serde_json::from_str(&body).unwrap_or_default();
            let detail = problem.detail.or(problem.title).unwrap_or(body);
            log::warn!("(send_message) Provider answered {}: {}", status, detail);
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let accepted: AcceptedMessage = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{e}: {body}")))?;
        if accepted.message_uuid.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "empty message_uuid".to_string(),
            ));
        }

        log::info!(
            "(send_message) Provider accepted message_uuid={}",
            accepted.message_uuid
        );
        Ok(accepted.message_uuid)
    }
}
