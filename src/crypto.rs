// src/crypto.rs
use crate::error::MarketError;
use crate::normalize::parse_decimal;
use crate::source::USER_AGENT;
use crate::valuation::TokenPrices;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const PAXG_PAIR: &str = "PAXG_USDT";
pub const XAUT_PAIR: &str = "XAUT_USDT";

/// Source of gold-backed token prices in USD.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// A token whose quote fails is left as `None`.
    async fn token_prices(&self) -> TokenPrices;
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(default)]
    data: Vec<Ticker>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    last: Value,
}

/// Parses `{"data":[{"last":"2345.6"}]}`; `last` may be a string or a number.
fn parse_ticker(body: &str) -> Result<f64, MarketError> {
    let response: TickerResponse = serde_json::from_str(body)?;
    let ticker = response
        .data
        .first()
        .ok_or_else(|| MarketError::SourceUnavailable("empty ticker data".into()))?;

    let price = match &ticker.last {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s)?,
        _ => None,
    };
    price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| MarketError::SourceUnavailable(format!("no usable last price: {}", ticker.last)))
}

pub struct MexcQuoteProvider {
    client: Client,
    ticker_url: String,
}

impl MexcQuoteProvider {
    pub fn new(ticker_url: &str, timeout: Duration) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            ticker_url: ticker_url.to_string(),
        })
    }

    pub async fn last_price(&self, pair: &str) -> Result<f64, MarketError> {
        let response = self
            .client
            .get(&self.ticker_url)
            .query(&[("symbol", pair)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MarketError::SourceUnavailable(format!(
                "ticker {} returned {}: {}",
                pair, status, body
            )));
        }
        parse_ticker(&body)
    }

    async fn quote(&self, pair: &str) -> Option<f64> {
        match self.last_price(pair).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("Quote for {} unavailable: {}", pair, e);
                None
            }
        }
    }
}

#[async_trait]
impl QuoteProvider for MexcQuoteProvider {
    async fn token_prices(&self) -> TokenPrices {
        let prices = TokenPrices {
            paxg: self.quote(PAXG_PAIR).await,
            xaut: self.quote(XAUT_PAIR).await,
        };
        info!("Token prices: PAXG {:?}, XAUT {:?}", prices.paxg, prices.xaut);
        prices
    }
}
