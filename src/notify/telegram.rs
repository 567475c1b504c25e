use super::NotificationSink;
use crate::config::NotifierConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Telegram Bot API notification sink
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    message_timeout: Duration,
    photo_timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        let notifier = Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            message_timeout: Duration::from_secs(config.message_timeout_secs),
            photo_timeout: Duration::from_secs(config.photo_timeout_secs),
        };

        if notifier.is_configured() {
            info!("Telegram notifications enabled for chat {}", notifier.chat_id);
        } else {
            warn!("Telegram bot token or chat id not set; notifications will be skipped");
        }

        notifier
    }

    /// Check if both credentials are present
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn finish(&self, method: &str, result: reqwest::Result<reqwest::Response>) -> bool {
        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Telegram {} succeeded", method);
                true
            }
            Ok(response) => {
                warn!("Telegram {} returned status {}", method, response.status());
                false
            }
            Err(e) => {
                warn!("Telegram {} failed: {}", method, e);
                false
            }
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send_text(&self, message: &str) -> bool {
        if !self.is_configured() {
            debug!("Skipping text notification: credentials not set");
            return false;
        }

        let result = self
            .client
            .post(self.endpoint("sendMessage"))
            .form(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .timeout(self.message_timeout)
            .send()
            .await;

        self.finish("sendMessage", result).await
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> bool {
        if !self.is_configured() {
            debug!("Skipping photo notification: credentials not set");
            return false;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot read photo {}: {}", path.display(), e);
                return false;
            }
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.jpg".to_string());

        let part = match Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg") {
            Ok(part) => part,
            Err(e) => {
                warn!("Failed to build photo upload: {}", e);
                return false;
            }
        };

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", part);

        let result = self
            .client
            .post(self.endpoint("sendPhoto"))
            .multipart(form)
            .timeout(self.photo_timeout)
            .send()
            .await;

        self.finish("sendPhoto", result).await
    }
}
