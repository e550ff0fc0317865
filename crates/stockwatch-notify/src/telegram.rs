//! Telegram Bot API sink.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stockwatch_core::{
    AppConfig, DeliveryReport, NotificationSink, RecipientId, RecipientOutcome, RecipientResult,
};

use crate::error::DeliveryError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
}

/// Sends HTML-formatted messages through `sendMessage`.
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    /// # Errors
    ///
    /// Returns [`DeliveryError::NotConfigured`] for an empty token, or
    /// [`DeliveryError::Http`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, token: &str) -> Result<Self, DeliveryError> {
        if token.trim().is_empty() {
            return Err(DeliveryError::NotConfigured(
                "TELEGRAM_BOT_TOKEN is empty".to_owned(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token: token.trim().to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns [`DeliveryError::NotConfigured`] when no bot token is set.
    pub fn from_config(config: &AppConfig) -> Result<Self, DeliveryError> {
        let token = config
            .telegram_bot_token
            .as_deref()
            .ok_or_else(|| DeliveryError::NotConfigured("TELEGRAM_BOT_TOKEN is not set".to_owned()))?;
        Self::new(&config.telegram_api_base, token)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn read_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, DeliveryError> {
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        let parsed = serde_json::from_str::<ApiResponse<T>>(&body).ok();

        match parsed {
            Some(api) if status.is_success() && api.ok => Ok(api.result),
            Some(api) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: api
                    .description
                    .unwrap_or_else(|| "no description".to_owned()),
            }),
            None => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: format!("unreadable response: {}", truncate(&body, 200)),
            }),
        }
    }

    /// Sends one message to one chat.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Rejected`] on a non-2xx status or an
    /// `"ok": false` body, or [`DeliveryError::Http`] on transport failure.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        Self::read_response::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Calls `getMe` and returns the bot's display name.
    ///
    /// # Errors
    ///
    /// Same as [`TelegramSink::send_message`].
    pub async fn test_connection(&self) -> Result<String, DeliveryError> {
        let response = self
            .client
            .get(self.endpoint("getMe"))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let user = Self::read_response::<BotUser>(response).await?;
        let name = user
            .and_then(|u| u.username.map(|n| format!("@{n}")).or(u.first_name))
            .unwrap_or_else(|| "unknown bot".to_owned());
        tracing::info!(bot = %name, "telegram connection verified");
        Ok(name)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, recipients: &[RecipientId], message: &str) -> DeliveryReport {
        let sends = recipients.iter().map(|recipient| async move {
            let outcome = match self.send_message(recipient, message).await {
                Ok(()) => {
                    tracing::info!(recipient = %recipient, "telegram message sent");
                    RecipientOutcome::Delivered
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, error = %e, "telegram delivery failed");
                    RecipientOutcome::Failed(e.to_string())
                }
            };
            RecipientResult {
                recipient: recipient.clone(),
                outcome,
            }
        });

        DeliveryReport {
            results: join_all(sends).await,
        }
    }
}
