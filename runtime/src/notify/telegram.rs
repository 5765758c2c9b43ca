use super::{Notification, NotificationSink, SinkError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const OPEN_BUTTON_LABEL: &str = "Открыть";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'static str,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers notifications through the Telegram Bot API `sendMessage` call.
///
/// Messages use HTML parse mode and carry an inline "open" button when the
/// notification has a deep link.
#[derive(Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
}

impl TelegramSink {
    /// Sink for the bot identified by `bot_token`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Transport`] if the HTTP client cannot be built.
    pub fn new(bot_token: &str) -> Result<Self, SinkError> {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Sink talking to a Bot API compatible server at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Transport`] if the HTTP client cannot be built.
    pub fn with_api_base(bot_token: &str, api_base: &str) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{bot_token}/sendMessage",
                api_base.trim_end_matches('/')
            ),
        })
    }
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the bot token
        f.debug_struct("TelegramSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, notification: &Notification) -> Result<(), SinkError> {
        let payload = SendMessage {
            chat_id: notification.recipient.get(),
            text: &notification.text,
            parse_mode: "HTML",
            reply_markup: notification.open_url.as_deref().map(|url| ReplyMarkup {
                inline_keyboard: vec![vec![InlineButton {
                    text: OPEN_BUTTON_LABEL,
                    url,
                }]],
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| SinkError::Transport(e.without_url().to_string()))?;

        if status.is_success() && body.ok {
            tracing::debug!(recipient = %notification.recipient, "Telegram message sent");
            Ok(())
        } else {
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body: body
                    .description
                    .unwrap_or_else(|| "unknown Telegram API error".to_string()),
            })
        }
    }
}
