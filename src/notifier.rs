//! Outbound bot-channel delivery capability.
//!
//! The workflow receives a `Notifier` by injection; nothing in the crate
//! holds a process-global bot client. Delivery is best-effort from the
//! workflow's point of view: callers log failures and move on.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Delivery failure. Never escalated past a warn log by the workflow.
#[derive(Debug)]
pub enum NotifyError {
    /// Transport-level failure
    Network(String),
    /// The bot API answered with an error
    Rejected(String),
    /// No token configured
    NotConfigured,
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Network(e) => write!(f, "delivery network error: {}", e),
            NotifyError::Rejected(desc) => write!(f, "delivery rejected: {}", desc),
            NotifyError::NotConfigured => write!(f, "bot channel is not configured"),
        }
    }
}

impl std::error::Error for NotifyError {}

/// A channel that can push a document to a citizen.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        data: Vec<u8>,
        caption: &str,
    ) -> Result<(), NotifyError>;
}

/// Response envelope of the bot API
#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram bot API implementation of [`Notifier`].
pub struct TelegramNotifier {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(token: String, api_base: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client for the bot channel.");

        Self {
            http,
            token,
            api_base,
        }
    }

    /// Build from the global application configuration.
    pub fn from_config() -> Self {
        let config = crate::app_config::bot();

        if config.token.is_empty() {
            log::warn!("MURAJAAT_BOT_TOKEN is not set; citizen deliveries will fail.");
        }

        Self::new(
            config.token,
            config.api_base,
            Duration::from_secs(config.timeout_seconds),
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_document(
        &self,
        chat_id: i64,
        filename: &str,
        data: Vec<u8>,
        caption: &str,
    ) -> Result<(), NotifyError> {
        if self.token.is_empty() {
            return Err(NotifyError::NotConfigured);
        }

        let url = format!("{}/bot{}/sendDocument", self.api_base, self.token);

        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(())
    }
}
