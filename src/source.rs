// src/source.rs
use crate::config::{AnalyzerConfig, UnlockerConfig};
use crate::error::MarketError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Time-bounded wait used for polling and settle delays.
///
/// Injected so tests can simulate slow or never-ready pages without sleeping.
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration);
}

pub struct TokioWaiter;

#[async_trait]
impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A browser-like session owned by exactly one extraction pass.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), MarketError>;

    /// Current rendered HTML of the page last navigated to.
    async fn content(&mut self) -> Result<String, MarketError>;

    /// Releases the session. Called on every exit path of a pass.
    async fn close(&mut self) -> Result<(), MarketError>;
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, MarketError>;
}

/// Fetches rendered pages over HTTP, either directly or through the
/// Bright Data Web Unlocker with rendering enabled.
#[derive(Clone)]
pub struct HttpPageSource {
    client: Client,
    unlocker: Option<UnlockerConfig>,
}

impl HttpPageSource {
    pub fn new(page_load_timeout: Duration, unlocker: Option<UnlockerConfig>) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(page_load_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, unlocker })
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, MarketError> {
        Self::new(config.page_load_timeout, config.unlocker.clone())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn open(&self) -> Result<Box<dyn PageSession>, MarketError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            unlocker: self.unlocker.clone(),
            url: None,
        }))
    }
}

struct HttpSession {
    client: Client,
    unlocker: Option<UnlockerConfig>,
    url: Option<String>,
}

impl HttpSession {
    async fn fetch_direct(&self, url: &str) -> Result<String, MarketError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::SourceUnavailable(format!(
                "GET {} returned {}",
                url, status
            )));
        }
        Ok(response.text().await?)
    }

    async fn fetch_rendered(&self, unlocker: &UnlockerConfig, url: &str) -> Result<String, MarketError> {
        let payload = json!({
            "url": url,
            "zone": unlocker.zone,
            "format": "raw",
            "render": true
        });

        let response = self
            .client
            .post(format!("{}/request", unlocker.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", unlocker.api_token))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MarketError::SourceUnavailable(format!(
                "unlocker error {} for {}: {}",
                status, url, error_text
            )));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), MarketError> {
        info!("Navigating to {}", url);
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String, MarketError> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| MarketError::SourceUnavailable("no page loaded".into()))?;

        let html = match &self.unlocker {
            Some(unlocker) => self.fetch_rendered(unlocker, url).await?,
            None => self.fetch_direct(url).await?,
        };
        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(html)
    }

    async fn close(&mut self) -> Result<(), MarketError> {
        if let Some(url) = self.url.take() {
            debug!("Closed session for {}", url);
        }
        Ok(())
    }
}
