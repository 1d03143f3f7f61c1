//! # Telegram Bot API Transport
//!
//! Posts Markdown messages to a single chat through `sendMessage`. A delivery
//! counts as successful only when the reply body carries `"ok": true`; the HTTP
//! status is informational.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notifiers::{ChatTransport, DeliveryError};
use crate::retrieve::{ApiClient, ApiClientOptions, ApiResponse, RetrieveError};

/// Production Bot API root.
pub const DEFAULT_TELEGRAM_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Envelope of every Bot API reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramReply {
    /// Whether the call succeeded.
    #[serde(default)]
    pub ok: bool,
    /// Error text when `ok` is false.
    #[serde(default)]
    pub description: Option<String>,
    /// Method-specific payload.
    #[serde(default)]
    pub result: Option<Value>,
}

impl TelegramReply {
    /// Interprets a reply. `ok: true` wins over any HTTP status.
    fn into_outcome(self, status: u16) -> Result<Value, DeliveryError> {
        if self.ok {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        let description = self.description.unwrap_or_else(|| "Unknown error".to_string());
        if (200..300).contains(&status) {
            Err(DeliveryError::Rejected { description })
        } else {
            Err(DeliveryError::Upstream { status, description })
        }
    }

    fn from_response(response: ApiResponse<TelegramReply>) -> Result<Value, DeliveryError> {
        let status = response.status;
        match response.data {
            Some(reply) => reply.into_outcome(status),
            None => {
                let raw = response.error_body.unwrap_or_default();
                match serde_json::from_str::<TelegramReply>(&raw) {
                    Ok(reply) => reply.into_outcome(status),
                    Err(_) => Err(DeliveryError::Upstream { status, description: raw }),
                }
            }
        }
    }
}

/// `sendMessage` client bound to one bot token and chat.
pub struct TelegramClient {
    client: ApiClient,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    /// Creates a client against `base_url` (normally [`DEFAULT_TELEGRAM_URL`]).
    pub fn new(base_url: &str, token: &str, chat_id: &str, timeout: Duration) -> Result<Self, RetrieveError> {
        let options = ApiClientOptions {
            timeout,
            ..Default::default()
        };
        Ok(Self {
            client: ApiClient::new(base_url, options)?,
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn method_path(&self, method: &str) -> String {
        format!("bot{}/{}", self.token, method)
    }

    /// Calls `getMe` and logs the bot's name.
    ///
    /// Returns false when the token is rejected or the API is unreachable; the
    /// bot keeps running either way.
    pub async fn check_connection(&self) -> bool {
        let outcome = match self.client.get::<TelegramReply>(&self.method_path("getMe"), &[]).await {
            Ok(response) => TelegramReply::from_response(response),
            Err(e) => Err(DeliveryError::from(e)),
        };

        match outcome {
            Ok(result) => {
                let name = result
                    .get("first_name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                info!("Telegram bot connected successfully: {}", name);
                true
            }
            Err(e) => {
                error!("Error testing bot connection: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        debug!("Sending message to chat {}", self.chat_id);
        let response = self
            .client
            .post::<TelegramReply, _>(&self.method_path("sendMessage"), &payload)
            .await?;

        TelegramReply::from_response(response)?;
        info!("Message sent successfully");
        Ok(())
    }
}
