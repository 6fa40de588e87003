// src/config.rs
use crate::error::MarketError;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ETF_URL: &str = "https://tradersarena.ir/industries/68f";
pub const DEFAULT_PRICE_BOARD_URL: &str = "https://bon-bast.com";
pub const DEFAULT_CRYPTO_TICKER_URL: &str = "https://www.mexc.com/open/api/v2/market/ticker";
pub const DEFAULT_UNLOCKER_BASE_URL: &str = "https://api.brightdata.com";

/// Zero-based cell offsets of the fund table.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnLayout {
    pub symbol: usize,
    pub volume: usize,
    pub price: usize,
    pub reference: usize,
    pub bubble: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            symbol: 0,
            volume: 1,
            price: 6,
            reference: 8,
            bubble: 9,
        }
    }
}

/// Bounds for waiting on a dynamically rendered element.
#[derive(Clone, Debug, PartialEq)]
pub struct WaitPolicy {
    /// Give up if the element is still missing after this long.
    pub max_wait: Duration,
    pub poll_interval: Duration,
    /// Applied in order once the element is present, before reading.
    pub settle_delays: Vec<Duration>,
}

impl WaitPolicy {
    pub fn new(max_wait: Duration, poll_interval: Duration, settle_delays: Vec<Duration>) -> Self {
        Self {
            max_wait,
            poll_interval,
            settle_delays,
        }
    }

    /// No polling and no settling; handy for static fixtures.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Vec::new())
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(60),
            Duration::from_secs(1),
            vec![Duration::from_secs(10)],
        )
    }
}

/// Bright Data Web Unlocker settings used to fetch rendered pages.
#[derive(Clone, Debug)]
pub struct UnlockerConfig {
    pub api_token: String,
    pub zone: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub etf_url: String,
    pub etf_table_id: String,
    pub roster_table_id: String,
    pub price_board_url: String,
    pub crypto_ticker_url: String,
    pub page_load_timeout: Duration,
    pub table_wait: WaitPolicy,
    pub price_board_wait: WaitPolicy,
    pub extraction_retries: u32,
    pub cache_ttl: Duration,
    pub reserved_row_ids: Vec<String>,
    pub sentinel_symbols: Vec<String>,
    pub columns: ColumnLayout,
    pub unlocker: Option<UnlockerConfig>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            etf_url: DEFAULT_ETF_URL.to_string(),
            etf_table_id: "industriesTable".to_string(),
            roster_table_id: "navTable".to_string(),
            price_board_url: DEFAULT_PRICE_BOARD_URL.to_string(),
            crypto_ticker_url: DEFAULT_CRYPTO_TICKER_URL.to_string(),
            page_load_timeout: Duration::from_secs(180),
            table_wait: WaitPolicy::default(),
            price_board_wait: WaitPolicy::new(
                Duration::from_secs(20),
                Duration::from_secs(1),
                vec![Duration::from_secs(5), Duration::from_secs(2)],
            ),
            extraction_retries: 0,
            cache_ttl: Duration::from_secs(300),
            reserved_row_ids: vec!["minrow".to_string(), "maxrow".to_string()],
            sentinel_symbols: vec![
                "حداقل".to_string(),
                "حداکثر".to_string(),
                "min".to_string(),
                "max".to_string(),
            ],
            columns: ColumnLayout::default(),
            unlocker: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self, MarketError> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let table_wait = WaitPolicy::new(
            Duration::from_secs(env_parse("TABLE_WAIT_SECONDS", 60u64)?),
            Duration::from_millis(env_parse("POLL_INTERVAL_MILLIS", 1000u64)?),
            env_secs_list("SETTLE_DELAYS_SECONDS", &[10])?,
        );

        let unlocker = env::var("BRIGHTDATA_API_TOKEN").ok().map(|api_token| UnlockerConfig {
            api_token,
            zone: env::var("WEB_UNLOCKER_ZONE").unwrap_or_else(|_| "default".to_string()),
            base_url: env::var("BRIGHTDATA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_UNLOCKER_BASE_URL.to_string()),
        });

        let config = Self {
            etf_url: env::var("ETF_SOURCE_URL").unwrap_or(defaults.etf_url),
            etf_table_id: env::var("ETF_TABLE_ID").unwrap_or(defaults.etf_table_id),
            roster_table_id: env::var("ETF_ROSTER_TABLE_ID").unwrap_or(defaults.roster_table_id),
            price_board_url: env::var("PRICE_BOARD_URL").unwrap_or(defaults.price_board_url),
            crypto_ticker_url: env::var("CRYPTO_TICKER_URL").unwrap_or(defaults.crypto_ticker_url),
            page_load_timeout: Duration::from_secs(env_parse("PAGE_LOAD_TIMEOUT_SECONDS", 180u64)?),
            table_wait,
            extraction_retries: env_parse("EXTRACTION_RETRIES", 0u32)?,
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECONDS", 300u64)?),
            unlocker,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        for (name, value) in [
            ("ETF_SOURCE_URL", &self.etf_url),
            ("PRICE_BOARD_URL", &self.price_board_url),
            ("CRYPTO_TICKER_URL", &self.crypto_ticker_url),
        ] {
            Url::parse(value)
                .map_err(|e| MarketError::Config(format!("{} is not a valid URL ({}): {}", name, value, e)))?;
        }
        if let Some(unlocker) = &self.unlocker {
            Url::parse(&unlocker.base_url)
                .map_err(|e| MarketError::Config(format!("BRIGHTDATA_BASE_URL is not a valid URL: {}", e)))?;
        }
        if self.etf_table_id.trim().is_empty() {
            return Err(MarketError::Config("ETF_TABLE_ID must not be empty".to_string()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, MarketError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MarketError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn env_secs_list(name: &str, default: &[u64]) -> Result<Vec<Duration>, MarketError> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(default.iter().map(|s| Duration::from_secs(*s)).collect()),
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| MarketError::Config(format!("{} has an invalid entry: '{}'", name, part)))
        })
        .collect()
}
