//! Webhook notifier posting MessageCard payloads

use reqwest::Client;
use serde::{Deserialize, Serialize};
use settlewatch_core::config::NotifierConfig;
use settlewatch_core::error::{Error, Result};
use settlewatch_watcher::FileReady;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const CARD_CONTEXT: &str = "http://schema.org/extensions";
const CARD_TYPE: &str = "MessageCard";

/// Connector card body accepted by chat webhooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCard {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub card_type: String,
    pub text: String,
}

impl MessageCard {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            context: CARD_CONTEXT.to_string(),
            card_type: CARD_TYPE.to_string(),
            text: text.into(),
        }
    }
}

/// Posts one message per ready file to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    message_prefix: String,
}

impl WebhookNotifier {
    /// Create a notifier for `url`
    ///
    /// # Arguments
    /// * `url` - Webhook endpoint receiving the POST requests
    /// * `timeout_secs` - Request timeout in seconds
    /// * `message_prefix` - Text placed before the file path
    pub fn new(
        url: impl Into<String>,
        timeout_secs: u64,
        message_prefix: impl Into<String>,
    ) -> Result<Self> {
        let url = url.into();
        reqwest::Url::parse(&url)
            .map_err(|e| Error::config(format!("Invalid webhook URL '{url}': {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::notifier(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            message_prefix: message_prefix.into(),
        })
    }

    /// Build a notifier from settings; `None` when no URL is configured
    pub fn from_config(config: &NotifierConfig) -> Result<Option<Self>> {
        match config.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                info!("Webhook notifier enabled");
                info!("  URL: {url}");
                info!("  Timeout: {}s", config.timeout_secs);
                Self::new(url, config.timeout_secs, config.message_prefix.clone()).map(Some)
            }
            _ => {
                debug!("No webhook URL configured, notifier disabled");
                Ok(None)
            }
        }
    }

    /// Card announcing that `ready` is complete
    pub fn card_for(&self, ready: &FileReady) -> MessageCard {
        let path = ready.full_path.to_string_lossy().replace('\\', "/");
        MessageCard::new(format!("{}{path}", self.message_prefix))
    }

    /// Post a single ready event
    pub async fn notify(&self, ready: &FileReady) -> Result<()> {
        let card = self.card_for(ready);

        let response = self
            .client
            .post(&self.url)
            .json(&card)
            .send()
            .await
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection"
                } else {
                    "request"
                };
                Error::notifier(format!(
                    "Webhook delivery for {} failed ({error_kind}): {e}",
                    ready.name
                ))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        if !status.is_success() {
            return Err(Error::notifier(format!(
                "Webhook returned {status} for {}: {body}",
                ready.name
            )));
        }

        info!("Webhook response for {}: {body}", ready.name);
        Ok(())
    }

    /// Deliver every ready event from `receiver` until the channel closes
    pub async fn run(self, mut receiver: broadcast::Receiver<FileReady>) {
        loop {
            match receiver.recv().await {
                Ok(ready) => {
                    if let Err(e) = self.notify(&ready).await {
                        warn!("{e}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Webhook notifier lagged, skipped {skipped} ready events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("Webhook notifier stopped");
    }
}
