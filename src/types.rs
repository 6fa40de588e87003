// src/types.rs
use crate::error::MarketError;
use crate::units::{self, PURITY_18K, TROY_OUNCE_GRAMS};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Link found in the identifying cell of a row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellLink {
    pub text: String,
    pub title: Option<String>,
    pub href: Option<String>,
}

/// One table row as scraped: cell text only, nothing parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: Vec<String>,
    pub link: Option<CellLink>,
}

impl RawRow {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub symbol: String,
    pub display_name: String,
    /// Market price in rials.
    pub price: f64,
    /// NAV / intrinsic value in rials.
    pub reference_value: f64,
    pub volume: u64,
    pub bubble_percent: f64,
}

/// Records keyed by symbol, iterated in first-seen order.
///
/// Inserting an existing symbol replaces its record in place, so the value is
/// last-wins while the position stays where the symbol first appeared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBook {
    records: Vec<InstrumentRecord>,
    index: HashMap<String, usize>,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the replaced record when the symbol was already present.
    pub fn insert(&mut self, record: InstrumentRecord) -> Option<InstrumentRecord> {
        match self.index.get(&record.symbol) {
            Some(&slot) => Some(std::mem::replace(&mut self.records[slot], record)),
            None => {
                self.index.insert(record.symbol.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentRecord> {
        self.index.get(symbol).map(|&slot| &self.records[slot])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstrumentRecord> {
        self.records.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordBook {
    type Item = &'a InstrumentRecord;
    type IntoIter = std::slice::Iter<'a, InstrumentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<InstrumentRecord> for RecordBook {
    fn from_iter<I: IntoIterator<Item = InstrumentRecord>>(iter: I) -> Self {
        let mut book = RecordBook::new();
        for record in iter {
            book.insert(record);
        }
        book
    }
}

impl Serialize for RecordBook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.symbol, record)?;
        }
        map.end()
    }
}

struct RecordBookVisitor;

impl<'de> Visitor<'de> for RecordBookVisitor {
    type Value = RecordBook;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of symbol to instrument record")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RecordBook, A::Error> {
        let mut book = RecordBook::new();
        while let Some((symbol, mut record)) = access.next_entry::<String, InstrumentRecord>()? {
            record.symbol = symbol;
            book.insert(record);
        }
        Ok(book)
    }
}

impl<'de> Deserialize<'de> for RecordBook {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordBookVisitor)
    }
}

/// Upstream scalar prices, fixed for one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrices {
    /// USD sell rate in tomans.
    pub usd_rate: f64,
    /// Local 18k gold price per gram in tomans.
    pub gold_per_gram: f64,
    /// Global gold price per troy ounce in USD.
    pub global_ounce_usd: f64,
    pub purity_18k: f64,
    pub troy_ounce_grams: f64,
}

impl ReferencePrices {
    pub const GOLD_PER_GRAM_KEY: &'static str = "gold_per_gram";
    pub const USD_KEY: &'static str = "usd";
    pub const GLOBAL_GOLD_KEY: &'static str = "global_gold";

    pub fn new(gold_per_gram: f64, usd_rate: f64, global_ounce_usd: f64) -> Self {
        Self {
            usd_rate,
            gold_per_gram,
            global_ounce_usd,
            purity_18k: PURITY_18K,
            troy_ounce_grams: TROY_OUNCE_GRAMS,
        }
    }

    /// Builds prices from an upstream key/value mapping.
    pub fn from_map(values: &HashMap<String, f64>) -> Result<Self, MarketError> {
        let lookup = |key: &str| {
            values.get(key).copied().ok_or_else(|| {
                MarketError::ReferenceDataMissing(format!("missing '{}'", key))
            })
        };
        let prices = Self::new(
            lookup(Self::GOLD_PER_GRAM_KEY)?,
            lookup(Self::USD_KEY)?,
            lookup(Self::GLOBAL_GOLD_KEY)?,
        );
        prices.validate()?;
        Ok(prices)
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        let fields = [
            ("gold_per_gram", self.gold_per_gram),
            ("usd", self.usd_rate),
            ("global_gold", self.global_ounce_usd),
            ("purity_18k", self.purity_18k),
            ("troy_ounce_grams", self.troy_ounce_grams),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(MarketError::ReferenceDataMissing(format!(
                    "'{}' is not positive ({})",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// 18k gram price implied by the global ounce price and the USD rate.
    pub fn theoretical_gram_18k(&self) -> f64 {
        let pure = units::global_gram_price(self.global_ounce_usd, self.usd_rate, self.troy_ounce_grams);
        units::apply_purity(pure, self.purity_18k)
    }
}
