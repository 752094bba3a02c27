use super::{format_message, Notifier};
use crate::config::TelegramConfig;
use crate::models::Details;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

/// Sends one Bot API `sendMessage` per listing
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn send(&self, text: String) -> Result<()> {
        let body = json!({ "chat_id": self.chat_id, "text": text });

        self.client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .context("telegram post")?
            .error_for_status()
            .context("telegram non-2xx")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, found: &Details) -> Result<()> {
        if found.is_empty() {
            return Ok(());
        }

        info!(count = found.len(), "Sending new listings to Telegram");
        for (id, record) in found {
            self.send(format_message(id, record))
                .await
                .with_context(|| format!("notifying listing {}", id))?;
            debug!(%id, "Sent");
        }
        Ok(())
    }
}
