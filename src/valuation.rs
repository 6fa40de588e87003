// src/valuation.rs
//! Bubble/premium math, ranking and the recommendation rules.
//!
//! Every premium leaving this module is a signed percentage rounded to one
//! decimal place. Nothing upstream rounds.

use crate::types::{InstrumentRecord, RecordBook, ReferencePrices};
use crate::units::{self, FULL_COIN_GRAMS, HALF_COIN_GRAMS, QUARTER_COIN_GRAMS};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const BEST_OPTION_THRESHOLD: f64 = 5.0;
pub const DIGITAL_FALLBACK_THRESHOLD: f64 = 10.0;
pub const GOOD_TIME_TO_BUY_BELOW: f64 = -5.0;

pub const LOW_BUBBLE_BELOW: f64 = 2.0;
pub const HIGH_BUBBLE_ABOVE: f64 = 5.0;
pub const HIGH_VOLUME_ABOVE: u64 = 1_000_000;
pub const LOW_VOLUME_BELOW: u64 = 100_000;

pub fn round_percent(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `(market - intrinsic) / intrinsic * 100`, unrounded. `None` when the
/// intrinsic value is not positive.
pub fn premium(market_price: f64, intrinsic_value: f64) -> Option<f64> {
    if !intrinsic_value.is_finite() || intrinsic_value <= 0.0 || !market_price.is_finite() {
        return None;
    }
    Some((market_price - intrinsic_value) / intrinsic_value * 100.0)
}

pub fn bubble_percent(market_price: f64, intrinsic_value: f64) -> Option<f64> {
    premium(market_price, intrinsic_value).map(round_percent)
}

/// Gold price a weighed instrument is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    /// Local 18k gram price lifted to 24k.
    Local,
    /// Global ounce price converted at the USD rate.
    Global,
}

pub fn intrinsic_value(prices: &ReferencePrices, weight_grams: f64, benchmark: Benchmark) -> f64 {
    let gram_price = match benchmark {
        Benchmark::Local => units::karat18_to_24(prices.gold_per_gram),
        Benchmark::Global => {
            units::global_gram_price(prices.global_ounce_usd, prices.usd_rate, prices.troy_ounce_grams)
        }
    };
    gram_price * weight_grams
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    DigitalToken,
    RawGold,
    Coin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOption {
    pub name: String,
    pub kind: InstrumentKind,
    pub premium: f64,
    pub liquidity: String,
    pub storage: String,
}

impl InvestmentOption {
    fn new(name: &str, kind: InstrumentKind, premium: f64, liquidity: &str, storage: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            premium,
            liquidity: liquidity.to_string(),
            storage: storage.to_string(),
        }
    }

    fn rounded(mut self) -> Self {
        self.premium = round_percent(self.premium);
        self
    }
}

/// Sorts by ascending absolute premium. Equal values keep their input order.
pub fn rank_by_abs_premium(options: &[InvestmentOption]) -> Vec<InvestmentOption> {
    let mut ranked = options.to_vec();
    ranked.sort_by(|a, b| a.premium.abs().total_cmp(&b.premium.abs()));
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingAdvice {
    GoodTimeToBuy,
    ConsiderWaiting,
}

impl TimingAdvice {
    pub fn from_gold_premium(gold_premium: f64) -> Self {
        if gold_premium < GOOD_TIME_TO_BUY_BELOW {
            TimingAdvice::GoodTimeToBuy
        } else {
            TimingAdvice::ConsiderWaiting
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TimingAdvice::GoodTimeToBuy => "Good time to buy! Gold price is below global price.",
            TimingAdvice::ConsiderWaiting => "Not an ideal time to buy. Consider waiting.",
        }
    }
}

/// Picks the best-investment wording from ranked options. Premiums are
/// compared unrounded.
pub fn best_investment(ranked: &[InvestmentOption], gold_premium: f64) -> String {
    if let Some(best) = ranked.first() {
        if best.premium.abs() < BEST_OPTION_THRESHOLD {
            return match best.kind {
                InstrumentKind::DigitalToken => format!(
                    "{} is the best option with minimal premium ({:.1}%). Digital gold offers global liquidity but requires crypto knowledge.",
                    best.name, best.premium
                ),
                InstrumentKind::RawGold => format!(
                    "{} is the best option with low premium ({:.1}%). Most liquid and divisible.",
                    best.name, best.premium
                ),
                InstrumentKind::Coin => format!(
                    "{} has the lowest bubble ({:.1}%) among physical options.",
                    best.name, best.premium
                ),
            };
        }
    }

    let digital_is_close = ranked
        .iter()
        .filter(|o| o.kind == InstrumentKind::DigitalToken)
        .any(|o| o.premium.abs() < DIGITAL_FALLBACK_THRESHOLD);
    if digital_is_close {
        return "Digital gold (PAXG/XAUT) might be safer due to lower premium, but requires crypto knowledge."
            .to_string();
    }

    // no coins quoted: gold is compared against +inf and wins
    let min_coin_bubble = ranked
        .iter()
        .filter(|o| o.kind == InstrumentKind::Coin)
        .map(|o| o.premium)
        .fold(f64::INFINITY, f64::min);
    if gold_premium < min_coin_bubble {
        return "18k Gold is safest due to lower premium than coins.".to_string();
    }

    "All options have high premiums. Consider waiting for better prices.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub avg_bubble: f64,
    pub std_bubble: f64,
    pub avg_volume: f64,
}

impl MarketStats {
    /// Mean and population standard deviation; `None` for an empty book.
    pub fn from_records(book: &RecordBook) -> Option<Self> {
        if book.is_empty() {
            return None;
        }
        let n = book.len() as f64;
        let avg_bubble = book.iter().map(|r| r.bubble_percent).sum::<f64>() / n;
        let variance = book
            .iter()
            .map(|r| (r.bubble_percent - avg_bubble).powi(2))
            .sum::<f64>()
            / n;
        let avg_volume = book.iter().map(|r| r.volume as f64).sum::<f64>() / n;

        Some(Self {
            avg_bubble,
            std_bubble: variance.sqrt(),
            avg_volume,
        })
    }
}

/// First record with the smallest bubble.
pub fn lowest_bubble(book: &RecordBook) -> Option<&InstrumentRecord> {
    book.iter().fold(None, |best: Option<&InstrumentRecord>, record| match best {
        Some(current) if record.bubble_percent >= current.bubble_percent => Some(current),
        _ => Some(record),
    })
}

/// First record with the largest volume.
pub fn highest_volume(book: &RecordBook) -> Option<&InstrumentRecord> {
    book.iter().fold(None, |best: Option<&InstrumentRecord>, record| match best {
        Some(current) if record.volume <= current.volume => Some(current),
        _ => Some(record),
    })
}

fn symbols_where(book: &RecordBook, predicate: impl Fn(&InstrumentRecord) -> bool) -> Option<String> {
    let symbols: Vec<&str> = book
        .iter()
        .filter(|r| predicate(r))
        .map(|r| r.symbol.as_str())
        .collect();
    if symbols.is_empty() {
        None
    } else {
        Some(symbols.join(", "))
    }
}

/// One line per matching condition; conditions overlap freely.
pub fn fund_recommendations(book: &RecordBook) -> Vec<String> {
    let mut recommendations = Vec::new();
    if let Some(symbols) = symbols_where(book, |r| r.bubble_percent < LOW_BUBBLE_BELOW) {
        recommendations.push(format!(
            "{} have minimal bubble (<2%). Good options for investment.",
            symbols
        ));
    }
    if let Some(symbols) = symbols_where(book, |r| r.volume > HIGH_VOLUME_ABOVE) {
        recommendations.push(format!(
            "{} have high trading volume. Better liquidity for large trades.",
            symbols
        ));
    }
    if let Some(symbols) = symbols_where(book, |r| r.bubble_percent > HIGH_BUBBLE_ABOVE) {
        recommendations.push(format!(
            "Caution: {} have high bubble (>5%). Consider waiting for better prices.",
            symbols
        ));
    }
    if let Some(symbols) = symbols_where(book, |r| r.volume < LOW_VOLUME_BELOW) {
        recommendations.push(format!(
            "Note: {} have low trading volume. May be difficult to trade large amounts.",
            symbols
        ));
    }
    recommendations
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub lowest_bubble: InstrumentRecord,
    pub highest_volume: InstrumentRecord,
    pub stats: MarketStats,
    pub recommendations: Vec<String>,
    pub funds: RecordBook,
    pub generated_at: DateTime<Utc>,
}

/// Local coin prices in tomans; `None` when the board did not show one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinPrices {
    pub full: Option<f64>,
    pub half: Option<f64>,
    pub quarter: Option<f64>,
}

impl CoinPrices {
    fn entries(&self) -> [(&'static str, f64, Option<f64>, &'static str); 3] {
        [
            ("Full Coin", FULL_COIN_GRAMS, self.full, "Very High"),
            ("Half Coin", HALF_COIN_GRAMS, self.half, "High"),
            ("Quarter Coin", QUARTER_COIN_GRAMS, self.quarter, "Medium"),
        ]
    }
}

/// Gold-backed token prices in USD per token (one troy ounce each).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPrices {
    pub paxg: Option<f64>,
    pub xaut: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    pub name: String,
    pub weight_grams: f64,
    pub price: f64,
    pub local_bubble: f64,
    pub global_bubble: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenQuote {
    pub symbol: String,
    pub price_usd: f64,
    /// Token price converted to tomans at the USD rate.
    pub price_local: f64,
    pub premium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub references: ReferencePrices,
    pub theoretical_gram_18k: f64,
    pub gold_premium: f64,
    pub coins: Vec<CoinQuote>,
    pub tokens: Vec<TokenQuote>,
    /// Ranked by ascending absolute premium.
    pub options: Vec<InvestmentOption>,
    pub timing: TimingAdvice,
    pub timing_advice: String,
    pub best_investment: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ValuationEngine;

impl ValuationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fund basket analysis. `None` when reference prices are unusable or
    /// there are no valid records.
    pub fn analyze_funds(&self, book: &RecordBook, prices: Option<&ReferencePrices>) -> Option<AnalysisResult> {
        match prices.map(ReferencePrices::validate) {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!("Skipping fund analysis: {}", e);
                return None;
            }
            None => {
                warn!("Skipping fund analysis: no reference prices");
                return None;
            }
        }

        if book.is_empty() {
            warn!("Skipping fund analysis: no valid fund records");
            return None;
        }
        let stats = MarketStats::from_records(book)?;
        let lowest = lowest_bubble(book)?.clone();
        let highest = highest_volume(book)?.clone();
        let recommendations = fund_recommendations(book);

        info!(
            "Analyzed {} funds: lowest bubble {} ({:.1}%), highest volume {}",
            book.len(),
            lowest.symbol,
            lowest.bubble_percent,
            highest.symbol
        );

        Some(AnalysisResult {
            lowest_bubble: lowest,
            highest_volume: highest,
            stats,
            recommendations,
            funds: book.clone(),
            generated_at: Utc::now(),
        })
    }

    /// Coins, raw gold and tokens ranked against one another.
    pub fn market_overview(
        &self,
        prices: &ReferencePrices,
        coins: &CoinPrices,
        tokens: &TokenPrices,
    ) -> Option<MarketOverview> {
        if let Err(e) = prices.validate() {
            warn!("Skipping market overview: {}", e);
            return None;
        }

        let theoretical = prices.theoretical_gram_18k();
        let gold_premium = premium(prices.gold_per_gram, theoretical)?;

        let mut options = vec![InvestmentOption::new(
            "18k Gold",
            InstrumentKind::RawGold,
            gold_premium,
            "High",
            "Easy",
        )];

        let mut coin_quotes = Vec::new();
        for (name, weight, price, liquidity) in coins.entries() {
            let price = match price.filter(|p| *p > 0.0) {
                Some(price) => price,
                None => continue,
            };
            let local = premium(price, intrinsic_value(prices, weight, Benchmark::Local))?;
            let global = bubble_percent(price, intrinsic_value(prices, weight, Benchmark::Global))?;
            options.push(InvestmentOption::new(name, InstrumentKind::Coin, local, liquidity, "Easy"));
            coin_quotes.push(CoinQuote {
                name: name.to_string(),
                weight_grams: weight,
                price,
                local_bubble: round_percent(local),
                global_bubble: global,
            });
        }

        let mut token_quotes = Vec::new();
        for (symbol, price) in [("PAXG", tokens.paxg), ("XAUT", tokens.xaut)] {
            let price = match price.filter(|p| *p > 0.0) {
                Some(price) => price,
                None => continue,
            };
            let token_premium = premium(price, prices.global_ounce_usd)?;
            options.push(InvestmentOption::new(
                symbol,
                InstrumentKind::DigitalToken,
                token_premium,
                "Medium",
                "Digital",
            ));
            token_quotes.push(TokenQuote {
                symbol: symbol.to_string(),
                price_usd: price,
                price_local: price * prices.usd_rate,
                premium: round_percent(token_premium),
            });
        }

        let ranked = rank_by_abs_premium(&options);
        let timing = TimingAdvice::from_gold_premium(gold_premium);
        let best = best_investment(&ranked, gold_premium);

        Some(MarketOverview {
            references: prices.clone(),
            theoretical_gram_18k: theoretical,
            gold_premium: round_percent(gold_premium),
            coins: coin_quotes,
            tokens: token_quotes,
            options: ranked.into_iter().map(InvestmentOption::rounded).collect(),
            timing,
            timing_advice: timing.message().to_string(),
            best_investment: best,
            generated_at: Utc::now(),
        })
    }
}
