//! Slack Web API client posting relay messages under per-message identities.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use herald_config::SlackConfig;
use herald_core::text_helpers::truncate_for_error;
use herald_core::transport_helpers::{send_with_retry, RetryPolicy};
use herald_core::{ChatTransport, SenderIdentity};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlackClientSettings {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl From<&SlackConfig> for SlackClientSettings {
    fn from(config: &SlackConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            token: config.auth.token.clone(),
            request_timeout_ms: config.request_timeout_ms,
            retry_max_attempts: config.retry_max_attempts,
            retry_base_delay_ms: config.retry_base_delay_ms,
        }
    }
}

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
}

impl SlackClient {
    pub fn new(settings: SlackClientSettings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("herald-slack-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.trim().to_string(),
            retry: RetryPolicy::new(settings.retry_max_attempts, settings.retry_base_delay_ms),
        })
    }
}

fn build_post_payload(channel: &str, sender: &SenderIdentity, text: &str) -> Value {
    let mut payload = json!({
        "channel": channel,
        "text": text,
        "username": sender.name,
        "mrkdwn": true,
    });
    if !sender.icon_url.trim().is_empty() {
        payload["icon_url"] = Value::String(sender.icon_url.clone());
    }
    if let Some(icon_emoji) = sender
        .icon_emoji
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        payload["icon_emoji"] = Value::String(icon_emoji.to_string());
    }
    payload
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        sender: &SenderIdentity,
        text: &str,
    ) -> Result<()> {
        let payload = build_post_payload(channel, sender, text);
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = send_with_retry("slack chat.postMessage", self.retry, || {
            self.http
                .post(&url)
                .bearer_auth(&self.token)
                .json(&payload)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "slack api chat.postMessage failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        let parsed = response
            .json::<SlackChatMessageResponse>()
            .await
            .context("failed to decode slack chat.postMessage")?;
        if !parsed.ok {
            bail!(
                "slack chat.postMessage failed: {}",
                parsed.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(())
    }
}
