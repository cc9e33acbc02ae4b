//! Telegram Bot API client.
//!
//! Reminders are delivered as private messages via `sendMessage`; a user's
//! Telegram id doubles as the chat id of their conversation with the bot.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{NotificationError, Notifier};

/// Default Bot API base URL.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Body of a `sendMessage` call.
#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<base>/bot<token>/sendMessage`
    send_url: String,
}

impl TelegramClient {
    /// Create a client for `bot_token` against the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Config` if the token is empty or the HTTP
    /// client cannot be built.
    pub fn new(bot_token: &str, request_timeout: Duration) -> Result<Self, NotificationError> {
        Self::with_base_url(TELEGRAM_API_BASE, bot_token, request_timeout)
    }

    /// Create a client against a custom API base (self-hosted Bot API server).
    pub fn with_base_url(
        base_url: &str,
        bot_token: &str,
        request_timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let bot_token = bot_token.trim();
        if bot_token.is_empty() {
            return Err(NotificationError::Config("bot token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotificationError::Config(format!("failed to build HTTP client: {e}")))?;

        let send_url = format!(
            "{}/bot{bot_token}/sendMessage",
            base_url.trim_end_matches('/')
        );

        debug!(base_url, "Telegram client initialized");

        Ok(Self { http, send_url })
    }

    /// Send a text message to a chat.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Request` if the HTTP request fails, or
    /// `NotificationError::ApiError` if the API rejects the message.
    pub async fn send(&self, message: &SendMessage<'_>) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(&self.send_url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());

        let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();
        if status.is_success() && parsed.as_ref().is_some_and(|r| r.ok) {
            debug!(chat_id = message.chat_id, "Telegram message sent");
            return Ok(());
        }

        let detail = parsed.and_then(|r| r.description).unwrap_or(body);
        warn!(status = status.as_u16(), body = %detail, "Telegram API returned error");
        Err(NotificationError::ApiError {
            status: status.as_u16(),
            body: detail,
        })
    }
}

impl Notifier for TelegramClient {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError> {
        self.send(&SendMessage {
            chat_id: user_id,
            text,
        })
        .await
    }
}
