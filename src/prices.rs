// src/prices.rs
use crate::error::MarketError;
use crate::extractor::TableExtractor;
use crate::normalize::{digits_only, parse_decimal};
use crate::source::PageSource;
use crate::types::ReferencePrices;
use crate::valuation::CoinPrices;
use log::{debug, info, warn};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Element ids on the local price board.
pub const GOLD_18K_ID: &str = "gol18";
pub const USD_ID: &str = "usd1";
pub const GLOBAL_OUNCE_ID: &str = "ounce_top";
pub const FULL_COIN_ID: &str = "emami1";
pub const HALF_COIN_ID: &str = "azadi1_2";
pub const QUARTER_COIN_ID: &str = "azadi1_4";

/// Ids that must be present before the board is read.
pub const REQUIRED_IDS: [&str; 3] = [GOLD_18K_ID, USD_ID, GLOBAL_OUNCE_ID];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBoard {
    pub references: ReferencePrices,
    pub coins: CoinPrices,
}

fn element_text(document: &Html, id: &str) -> Option<String> {
    let selector = Selector::parse(&format!("[id=\"{}\"]", id)).ok()?;
    document.select(&selector).next().map(|element| {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn whole_price(document: &Html, id: &str) -> Option<f64> {
    let text = element_text(document, id)?;
    let value = digits_only(&text).map(|v| v as f64);
    if value.is_none() {
        debug!("#{}: no digits in '{}'", id, text);
    }
    value
}

/// Reads reference prices and coin quotes out of a price board page.
pub fn parse_price_board(html: &str) -> Result<PriceBoard, MarketError> {
    let document = Html::parse_document(html);
    let required = |id: &str, value: Option<f64>| {
        value.ok_or_else(|| MarketError::ReferenceDataMissing(format!("#{} missing or unreadable", id)))
    };

    let gold_per_gram = required(GOLD_18K_ID, whole_price(&document, GOLD_18K_ID))?;
    let usd_rate = required(USD_ID, whole_price(&document, USD_ID))?;
    let global_ounce = element_text(&document, GLOBAL_OUNCE_ID)
        .and_then(|text| match parse_decimal(&text) {
            Ok(value) => value,
            Err(e) => {
                debug!("#{}: {}", GLOBAL_OUNCE_ID, e);
                None
            }
        });
    let global_ounce = required(GLOBAL_OUNCE_ID, global_ounce)?;

    let references = ReferencePrices::new(gold_per_gram, usd_rate, global_ounce);
    references.validate()?;

    let coins = CoinPrices {
        full: whole_price(&document, FULL_COIN_ID),
        half: whole_price(&document, HALF_COIN_ID),
        quarter: whole_price(&document, QUARTER_COIN_ID),
    };

    Ok(PriceBoard { references, coins })
}

pub struct PriceBoardReader<'a> {
    extractor: &'a TableExtractor,
}

impl<'a> PriceBoardReader<'a> {
    pub fn new(extractor: &'a TableExtractor) -> Self {
        Self { extractor }
    }

    pub async fn read(&self, source: &dyn PageSource, url: &str) -> Result<PriceBoard, MarketError> {
        let html = self.extractor.capture(source, url, &REQUIRED_IDS).await?;
        let board = parse_price_board(&html)?;
        info!(
            "Price board: gold {} /g, usd {}, ounce ${}",
            board.references.gold_per_gram, board.references.usd_rate, board.references.global_ounce_usd
        );
        if board.coins.full.is_none() || board.coins.half.is_none() || board.coins.quarter.is_none() {
            warn!("Price board is missing some coin prices: {:?}", board.coins);
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"
        <div>
          <table><tr>
            <td id="gol18">1,000</td>
            <td id="usd1">50</td>
            <td id="emami1">9,000</td>
            <td id="azadi1_2">-</td>
          </tr></table>
          <span id="ounce_top"> 2,000.50 </span>
        </div>"#;

    #[test]
    fn reads_board() {
        let board = parse_price_board(BOARD).unwrap();
        assert_eq!(board.references.gold_per_gram, 1_000.0);
        assert_eq!(board.references.usd_rate, 50.0);
        assert_eq!(board.references.global_ounce_usd, 2_000.5);
        assert_eq!(board.coins.full, Some(9_000.0));
        assert_eq!(board.coins.half, None);
        assert_eq!(board.coins.quarter, None);
    }

    #[test]
    fn missing_reference_is_no_data() {
        let html = r#"<span id="gol18">1,000</span><span id="usd1">50</span>"#;
        assert!(matches!(
            parse_price_board(html),
            Err(MarketError::ReferenceDataMissing(_))
        ));

        let zero = r#"<span id="gol18">0</span><span id="usd1">50</span><span id="ounce_top">2000</span>"#;
        assert!(parse_price_board(zero).is_err());
    }
}
