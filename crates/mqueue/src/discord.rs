//! HTTP delivery client for the Discord REST API.

use crate::{ChannelId, DeliveryApi, DeliveryError, Embed, MqueueResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Base URL of the REST API, without trailing slash.
    pub api_base: String,
    /// Bot token, sent as `Authorization: Bot <token>`.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            token: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Request payload for creating a message.
#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<&'a Embed>,
}

/// Error body returned by the API on non-success responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Delivery client posting to `/channels/{id}/messages`.
pub struct DiscordSender {
    config: DiscordConfig,
    client: Client,
}

impl DiscordSender {
    pub fn new(config: DiscordConfig) -> MqueueResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    async fn create_message(
        &self,
        channel: ChannelId,
        request: &CreateMessageRequest<'_>,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/channels/{}/messages", self.config.api_base, channel);
        debug!(url = %url, "Sending message");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.config.token))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status.as_u16(), &body))
    }
}

#[async_trait]
impl DeliveryApi for DiscordSender {
    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<(), DeliveryError> {
        self.create_message(
            channel,
            &CreateMessageRequest {
                content: Some(text),
                embeds: Vec::new(),
            },
        )
        .await
    }

    async fn send_embed(&self, channel: ChannelId, embed: &Embed) -> Result<(), DeliveryError> {
        self.create_message(
            channel,
            &CreateMessageRequest {
                content: None,
                embeds: vec![embed],
            },
        )
        .await
    }
}

fn transport_error(e: reqwest::Error) -> DeliveryError {
    if e.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Network(e.to_string())
    }
}

/// Map a non-success response to a classified error.
fn error_from_response(status: u16, body: &str) -> DeliveryError {
    // The client retries rate limits itself rather than escalating them.
    if status == 429 {
        return DeliveryError::RateLimited;
    }

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) => DeliveryError::Http {
            status,
            code: (api.code != 0).then_some(api.code),
            message: api.message,
        },
        Err(_) => DeliveryError::Http {
            status,
            code: None,
            message: body.chars().take(200).collect(),
        },
    }
}
