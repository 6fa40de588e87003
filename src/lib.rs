// src/lib.rs
pub mod analyzer;
pub mod builder;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extractor;
pub mod normalize;
pub mod prices;
pub mod source;
pub mod types;
pub mod units;
pub mod valuation;

pub use analyzer::GoldMarketAnalyzer;
pub use cache::SnapshotCache;
pub use config::{AnalyzerConfig, ColumnLayout, WaitPolicy};
pub use error::{MarketError, ParseError};
pub use extractor::TableExtractor;
pub use source::{HttpPageSource, PageSession, PageSource, TokioWaiter, Waiter};
pub use types::{InstrumentRecord, RawRow, RecordBook, ReferencePrices};
pub use valuation::{AnalysisResult, MarketOverview, ValuationEngine};
