// src/error.rs
use thiserror::Error;

/// Field-level failure while interpreting scraped numeric text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a number: '{0}'")]
    NotNumeric(String),

    #[error("ambiguous magnitude suffix in '{0}'")]
    AmbiguousSuffix(String),

    #[error("negative count: '{0}'")]
    Negative(String),

    #[error("value out of range: '{0}'")]
    OutOfRange(String),
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Row rejected: {0}")]
    RowValidation(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Reference data missing: {0}")]
    ReferenceDataMissing(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    /// Whole-pass failures that callers treat as "no data this cycle".
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            MarketError::SourceUnavailable(_) | MarketError::ReferenceDataMissing(_)
        )
    }
}
