use crate::config::NotifyConfig;
use anyhow::Result;
use reqwest::Client;
use std::time::Duration;

/// Client for the media server's library refresh endpoint.
pub struct RefreshClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RefreshClient {
    /// Build a client from config; `None` when notifications are disabled or
    /// no URL is set.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let url = config.url.as_deref().filter(|u| !u.is_empty())?;
        Some(Self::new(
            url,
            config.api_key.as_deref().unwrap_or(""),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Trigger a library refresh
    pub async fn refresh_library(&self) -> Result<()> {
        let url = format!("{}/Library/Refresh", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-Emby-Token", &self.api_key)
            .header(
                "Authorization",
                format!("MediaBrowser Token=\"{}\"", self.api_key),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Library refresh failed ({}): {}", status, body);
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
