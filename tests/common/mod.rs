// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use gold_market_analyzer::crypto::QuoteProvider;
use gold_market_analyzer::valuation::TokenPrices;
use gold_market_analyzer::{MarketError, PageSession, PageSource, Waiter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ETF_URL: &str = "https://funds.test/industries/68f";
pub const BOARD_URL: &str = "https://board.test/";

pub const LOADING: &str = "<html><body><div class=\"spinner\">loading</div></body></html>";

/// Serves scripted HTML per URL. Each `content()` call advances that URL's
/// script; the last page repeats.
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<String, Vec<String>>,
    hits: Mutex<HashMap<String, usize>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, script: Vec<String>) -> Self {
        self.pages.insert(url.to_string(), script);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_page(&self, url: &str) -> Result<String, MarketError> {
        let script = self
            .pages
            .get(url)
            .ok_or_else(|| MarketError::SourceUnavailable(format!("unknown url {}", url)))?;
        let mut hits = self.hits.lock().unwrap();
        let hit = hits.entry(url.to_string()).or_insert(0);
        let page = script[(*hit).min(script.len() - 1)].clone();
        *hit += 1;
        Ok(page)
    }
}

pub struct ScriptedSession {
    source: Arc<ScriptedSource>,
    url: Option<String>,
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), MarketError> {
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String, MarketError> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| MarketError::SourceUnavailable("no page".into()))?;
        self.source.next_page(&url)
    }

    async fn close(&mut self) -> Result<(), MarketError> {
        self.source.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// `PageSource` handle over a shared script so tests can inspect counters.
#[derive(Clone)]
pub struct SharedSource(pub Arc<ScriptedSource>);

#[async_trait]
impl PageSource for SharedSource {
    async fn open(&self) -> Result<Box<dyn PageSession>, MarketError> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            source: self.0.clone(),
            url: None,
        }))
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingWaiter {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

#[async_trait]
impl Waiter for RecordingWaiter {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub struct FixedQuotes(pub TokenPrices);

#[async_trait]
impl QuoteProvider for FixedQuotes {
    async fn token_prices(&self) -> TokenPrices {
        self.0.clone()
    }
}

/// One fund-table row: symbol link, volume, price, NAV and bubble at the
/// live source's offsets.
pub fn fund_row(symbol: &str, title: &str, volume: &str, price: &str, nav: &str, bubble: &str) -> String {
    format!(
        "<tr><td><a href=\"/symbol/{symbol}\" title=\"{title}\">{symbol}</a></td><td>{volume}</td>\
         <td>a</td><td>b</td><td>c</td><td>d</td><td>{price}</td><td>e</td><td>{nav}</td><td>{bubble}</td></tr>"
    )
}

pub fn fund_table(rows: &[String]) -> String {
    format!(
        "<html><body><table id=\"industriesTable\"><thead><tr><th>Symbol</th></tr></thead><tbody>\
         <tr id=\"minrow\"><td><a>حداقل</a></td><td>-</td></tr>\
         {}\
         <tr id=\"maxrow\"><td><a>حداکثر</a></td><td>-</td></tr>\
         </tbody></table></body></html>",
        rows.join("")
    )
}

pub fn price_board(gold: &str, usd: &str, ounce: &str, full_coin: &str) -> String {
    format!(
        "<html><body><table><tr>\
         <td id=\"gol18\">{gold}</td><td id=\"usd1\">{usd}</td><td id=\"emami1\">{full_coin}</td>\
         </tr></table><div id=\"ounce_top\">{ounce}</div></body></html>"
    )
}
