// src/builder.rs
use crate::config::ColumnLayout;
use crate::error::{MarketError, ParseError};
use crate::normalize::{parse_abbreviated_count, parse_decimal, parse_percent, to_money};
use crate::types::{InstrumentRecord, RawRow, RecordBook};
use crate::units::RIAL_PER_TOMAN;
use log::{debug, info, warn};

/// Maps raw fund-table rows into validated instrument records.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    columns: ColumnLayout,
    sentinels: Vec<String>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(
            ColumnLayout::default(),
            vec!["حداقل".to_string(), "حداکثر".to_string(), "min".to_string(), "max".to_string()],
        )
    }
}

impl RecordBuilder {
    pub fn new(columns: ColumnLayout, sentinels: Vec<String>) -> Self {
        Self { columns, sentinels }
    }

    /// Builds the record book. Rejected rows are logged and skipped; an empty
    /// book is a valid outcome.
    pub fn build(&self, rows: &[RawRow]) -> RecordBook {
        let mut book = RecordBook::new();
        let mut rejected = 0usize;

        for (position, row) in rows.iter().enumerate() {
            match self.build_record(row) {
                Ok(Some(record)) => {
                    if let Some(previous) = book.insert(record) {
                        debug!("Row {}: '{}' replaces an earlier row", position, previous.symbol);
                    }
                }
                Ok(None) => debug!("Row {}: no symbol or marker row, skipped", position),
                Err(e) => {
                    rejected += 1;
                    warn!("Row {}: {}", position, e);
                }
            }
        }

        info!("Built {} records ({} rows rejected)", book.len(), rejected);
        book
    }

    /// `Ok(None)` means the row is not an instrument at all (blank or sentinel symbol).
    pub fn build_record(&self, row: &RawRow) -> Result<Option<InstrumentRecord>, MarketError> {
        let symbol = match &row.link {
            Some(link) if !link.text.trim().is_empty() => link.text.trim().to_string(),
            _ => row.cell(self.columns.symbol).unwrap_or("").trim().to_string(),
        };
        if symbol.is_empty() || self.is_sentinel(&symbol) {
            return Ok(None);
        }

        let display_name = row
            .link
            .as_ref()
            .and_then(|link| link.title.as_deref())
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(symbol.as_str())
            .to_string();

        let price = self.money_field(row, self.columns.price, "price", &symbol)?;
        let reference_value = self.money_field(row, self.columns.reference, "reference value", &symbol)?;

        let volume = match row.cell(self.columns.volume) {
            Some(text) => parse_abbreviated_count(text).unwrap_or_else(|e| {
                debug!("{}: volume defaulted to 0 ({})", symbol, e);
                0
            }),
            None => 0,
        };

        // kept as published; rounding is for display only
        let bubble_percent = match row.cell(self.columns.bubble).map(parse_percent) {
            Some(Ok(Some(bubble))) => bubble,
            Some(Err(e)) => {
                debug!("{}: bubble defaulted to 0 ({})", symbol, e);
                0.0
            }
            _ => 0.0,
        };

        Ok(Some(InstrumentRecord {
            symbol,
            display_name,
            price,
            reference_value,
            volume,
            bubble_percent,
        }))
    }

    fn is_sentinel(&self, symbol: &str) -> bool {
        self.sentinels.iter().any(|s| s == symbol)
    }

    fn money_field(&self, row: &RawRow, index: usize, field: &str, symbol: &str) -> Result<f64, MarketError> {
        let text = row.cell(index).ok_or_else(|| {
            MarketError::RowValidation(format!(
                "{}: no {} cell at offset {} ({} cells)",
                symbol,
                field,
                index,
                row.cells.len()
            ))
        })?;

        let value = parse_decimal(text)
            .map_err(|e: ParseError| MarketError::RowValidation(format!("{}: {} {}", symbol, field, e)))?
            .ok_or_else(|| MarketError::RowValidation(format!("{}: {} is missing", symbol, field)))?;

        if !value.is_finite() || value <= 0.0 {
            return Err(MarketError::RowValidation(format!(
                "{}: {} must be positive, got {}",
                symbol, field, value
            )));
        }
        Ok(to_money(value, RIAL_PER_TOMAN))
    }
}
