//! Jira REST and activity-stream client used as feed reader and issue lookup.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use herald_config::AtlassianConfig;
use herald_core::text_helpers::truncate_for_error;
use herald_core::transport_helpers::{send_with_retry, RetryPolicy};
use herald_core::{ActivityEntry, FeedReader, Issue, IssueLookup, LookupError, UserImage};
use reqwest::StatusCode;

use crate::activity_feed::parse_activity_feed;

const ACTIVITY_PROVIDER: &str = "issues";

#[derive(Debug, Clone)]
pub struct JiraClientSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl From<&AtlassianConfig> for JiraClientSettings {
    fn from(config: &AtlassianConfig) -> Self {
        Self {
            base_url: config.base_url(),
            username: config.auth.username.clone(),
            password: config.auth.password.clone(),
            request_timeout_ms: config.request_timeout_ms,
            retry_max_attempts: config.retry_max_attempts,
            retry_base_delay_ms: config.retry_base_delay_ms,
        }
    }
}

#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    retry: RetryPolicy,
}

impl JiraClient {
    pub fn new(settings: JiraClientSettings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("herald-jira-relay"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.request_timeout_ms.max(1)))
            .build()
            .context("failed to create jira api client")?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            username: settings.username,
            password: settings.password,
            retry: RetryPolicy::new(settings.retry_max_attempts, settings.retry_base_delay_ms),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Photo links may point at an avatar CDN; tracker credentials only go to
    /// URLs with the same scheme, host and port as the tracker itself.
    fn get_photo(&self, url: &str) -> reqwest::RequestBuilder {
        if self.shares_origin(url) {
            self.get(url)
        } else {
            self.http.get(url)
        }
    }

    fn shares_origin(&self, url: &str) -> bool {
        match (reqwest::Url::parse(url), reqwest::Url::parse(&self.base_url)) {
            (Ok(candidate), Ok(base)) => candidate.origin() == base.origin(),
            _ => false,
        }
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            href.to_string()
        }
    }
}

#[async_trait]
impl FeedReader for JiraClient {
    async fn fetch_new_entries(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let url = format!("{}/activity", self.base_url);
        let limit_value = limit.max(1).to_string();
        let response = send_with_retry("jira activity feed", self.retry, || {
            self.get(&url).query(&[
                ("maxResults", limit_value.as_str()),
                ("providers", ACTIVITY_PROVIDER),
            ])
        })
        .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read jira activity feed body")?;
        if !status.is_success() {
            bail!(
                "jira activity feed failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        parse_activity_feed(&body)
    }
}

#[async_trait]
impl IssueLookup for JiraClient {
    async fn get_issue(&self, key: &str) -> Result<Issue, LookupError> {
        let url = format!("{}/rest/api/latest/issue/{}", self.base_url, key);
        let response =
            send_with_retry("jira issue lookup", self.retry, || self.get(&url)).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Transport(anyhow!(
                "bad status code looking up issue {}: {}: {}",
                key,
                status.as_u16(),
                truncate_for_error(&body, 800)
            )));
        }

        let issue = response
            .json::<Issue>()
            .await
            .with_context(|| format!("failed to decode jira issue {key}"))?;
        Ok(issue)
    }

    async fn get_user_image(&self, activity: &ActivityEntry) -> Result<Option<UserImage>> {
        let Some(photo_url) = activity.author.photo_url.as_deref() else {
            return Ok(None);
        };
        let url = self.absolute_url(photo_url);
        let response =
            send_with_retry("jira user image", self.retry, || self.get_photo(&url)).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!(
                "jira user image for {} failed with status {}",
                activity.author.username,
                status.as_u16()
            );
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .context("failed to read jira user image body")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(UserImage {
            bytes: bytes.to_vec(),
            content_type,
        }))
    }
}
