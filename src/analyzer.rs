// src/analyzer.rs
use crate::builder::RecordBuilder;
use crate::cache::SnapshotCache;
use crate::catalog::{default_catalog, profiles_from_rows, FundProfile};
use crate::config::{AnalyzerConfig, WaitPolicy};
use crate::crypto::{MexcQuoteProvider, QuoteProvider};
use crate::error::MarketError;
use crate::extractor::TableExtractor;
use crate::prices::{PriceBoard, PriceBoardReader};
use crate::source::{HttpPageSource, PageSource, TokioWaiter, Waiter};
use crate::types::{RawRow, RecordBook, ReferencePrices};
use crate::valuation::{AnalysisResult, MarketOverview, ValuationEngine};
use log::{info, warn};
use std::sync::Arc;

/// Runs snapshot passes against the live sources.
///
/// Every public operation returns `None` for "no data this cycle"; the reason
/// is logged, never raised.
pub struct GoldMarketAnalyzer {
    config: AnalyzerConfig,
    source: Arc<dyn PageSource>,
    quotes: Arc<dyn QuoteProvider>,
    waiter: Arc<dyn Waiter>,
    builder: RecordBuilder,
    engine: ValuationEngine,
}

impl GoldMarketAnalyzer {
    pub fn new(
        config: AnalyzerConfig,
        source: Arc<dyn PageSource>,
        quotes: Arc<dyn QuoteProvider>,
        waiter: Arc<dyn Waiter>,
    ) -> Self {
        let builder = RecordBuilder::new(config.columns.clone(), config.sentinel_symbols.clone());
        Self {
            config,
            source,
            quotes,
            waiter,
            builder,
            engine: ValuationEngine::new(),
        }
    }

    /// Wires the HTTP page source, the exchange quote provider and real sleeps.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, MarketError> {
        let source = HttpPageSource::from_config(&config)?;
        let quotes = MexcQuoteProvider::new(&config.crypto_ticker_url, config.page_load_timeout)?;
        Ok(Self::new(
            config,
            Arc::new(source),
            Arc::new(quotes),
            Arc::new(TokioWaiter),
        ))
    }

    /// Empty snapshot cache with the configured freshness window.
    pub fn snapshot_cache<T: Clone>(&self) -> SnapshotCache<T> {
        SnapshotCache::new(self.config.cache_ttl)
    }

    fn extractor(&self, policy: &WaitPolicy) -> TableExtractor {
        TableExtractor::new(policy.clone(), self.waiter.clone())
            .with_reserved_row_ids(self.config.reserved_row_ids.clone())
            .with_link_cell(self.config.columns.symbol)
    }

    /// One extraction pass plus up to `extraction_retries` repeats.
    async fn extract_with_retries(&self, url: &str, table_id: &str) -> Result<Vec<RawRow>, MarketError> {
        let extractor = self.extractor(&self.config.table_wait);
        let attempts = self.config.extraction_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match extractor.extract(self.source.as_ref(), url, table_id).await {
                Ok(rows) => return Ok(rows),
                Err(e) if attempt < attempts => {
                    warn!("Attempt {}/{} for #{} failed: {}", attempt, attempts, table_id, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn fetch_price_board(&self) -> Option<PriceBoard> {
        let extractor = self.extractor(&self.config.price_board_wait);
        match PriceBoardReader::new(&extractor)
            .read(self.source.as_ref(), &self.config.price_board_url)
            .await
        {
            Ok(board) => Some(board),
            Err(e) => {
                warn!("No price board this cycle: {}", e);
                None
            }
        }
    }

    pub async fn fetch_reference_prices(&self) -> Option<ReferencePrices> {
        self.fetch_price_board().await.map(|board| board.references)
    }

    /// Fund records from the live table. An empty book is still `Some`.
    pub async fn fetch_fund_records(&self) -> Option<RecordBook> {
        match self
            .extract_with_retries(&self.config.etf_url, &self.config.etf_table_id)
            .await
        {
            Ok(rows) => Some(self.builder.build(&rows)),
            Err(e) => {
                warn!("No fund data this cycle: {}", e);
                None
            }
        }
    }

    /// Live fund roster, or the built-in catalog when it cannot be read.
    pub async fn discover_funds(&self) -> Vec<FundProfile> {
        let profiles = match self
            .extract_with_retries(&self.config.etf_url, &self.config.roster_table_id)
            .await
        {
            Ok(rows) => profiles_from_rows(&rows, &self.config.sentinel_symbols),
            Err(e) => {
                warn!("Fund roster unavailable, using built-in catalog: {}", e);
                return default_catalog();
            }
        };

        if profiles.is_empty() {
            warn!("Fund roster had no funds, using built-in catalog");
            return default_catalog();
        }
        info!("Discovered {} gold funds", profiles.len());
        profiles
    }

    /// Reference prices first, then the fund table, then the basket analysis.
    pub async fn get_analysis(&self) -> Option<AnalysisResult> {
        let prices = self.fetch_reference_prices().await?;
        let book = self.fetch_fund_records().await?;
        self.engine.analyze_funds(&book, Some(&prices))
    }

    pub async fn get_analysis_cached(&self, cache: &SnapshotCache<AnalysisResult>) -> Option<AnalysisResult> {
        cache.get_or_refresh(|| self.get_analysis()).await
    }

    pub async fn market_overview(&self) -> Option<MarketOverview> {
        let board = self.fetch_price_board().await?;
        let tokens = self.quotes.token_prices().await;
        self.engine.market_overview(&board.references, &board.coins, &tokens)
    }

    pub async fn market_overview_cached(&self, cache: &SnapshotCache<MarketOverview>) -> Option<MarketOverview> {
        cache.get_or_refresh(|| self.market_overview()).await
    }
}
