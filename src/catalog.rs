// src/catalog.rs
use crate::types::RawRow;
use crate::units::FUND_UNIT_GOLD_GRAMS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundProfile {
    pub symbol: String,
    pub name: String,
    /// Grams of gold backing one fund unit.
    pub gold_weight_grams: f64,
    pub gold_purity: f64,
}

impl FundProfile {
    pub fn new(symbol: &str, name: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            gold_weight_grams: FUND_UNIT_GOLD_GRAMS,
            gold_purity: 1.0,
        }
    }
}

/// Known gold funds, used when the live roster cannot be read.
pub fn default_catalog() -> Vec<FundProfile> {
    [
        ("طلا", "صندوق سرمایه پشتوانه لوتوس"),
        ("عیار", "صندوق طلای کیان"),
        ("مفید", "صندوق سرمایه گذاری پشتوانه طلای مفید"),
        ("زر", "صندوق پشتوانه سکه طلای زرافشان امید ایرانیان"),
        ("کزر", "صندوق سرمایه گذاری طلای کیمیای زرین کاردان"),
        ("صبا", "صندوق سرمایه گذاری مبتنی بر طلای صبا"),
        ("زرفام", "صندوق سرمایه گذاری مبتنی بر طلای زرفام آشنا"),
        ("زرین", "صندوق سرمایه گذاری زرین آگاه"),
        ("تابان", "صندوق سرمایه گذاری تابان تمدن"),
        ("زاگرس", "صندوق سرمایه گذاری زاگرس"),
        ("آلتون", "صندوق سرمایه گذاری آسمان آلتون"),
    ]
    .iter()
    .map(|(symbol, name)| FundProfile::new(symbol, name))
    .collect()
}

/// Last non-empty path segment of a link target.
fn slug(href: &str) -> Option<&str> {
    href.split(['?', '#'])
        .next()
        .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty())
}

/// Fund profiles from roster rows, skipping blank and sentinel symbols.
/// The name is the link target's last path segment, else the symbol.
pub fn profiles_from_rows(rows: &[RawRow], sentinels: &[String]) -> Vec<FundProfile> {
    let mut profiles: Vec<FundProfile> = Vec::new();
    for row in rows {
        let link = match &row.link {
            Some(link) => link,
            None => continue,
        };
        let symbol = link.text.trim();
        if symbol.is_empty() || sentinels.iter().any(|s| s == symbol) {
            continue;
        }
        let name = link.href.as_deref().and_then(slug).unwrap_or(symbol);

        let profile = FundProfile::new(symbol, name);
        match profiles.iter().position(|p| p.symbol == symbol) {
            Some(slot) => profiles[slot] = profile,
            None => profiles.push(profile),
        }
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellLink;

    fn linked(text: &str, href: Option<&str>) -> RawRow {
        RawRow {
            cells: vec![text.to_string()],
            link: Some(CellLink {
                text: text.to_string(),
                title: None,
                href: href.map(str::to_string),
            }),
        }
    }

    #[test]
    fn names_come_from_link_targets() {
        let rows = vec![
            linked("طلا", Some("https://tradersarena.ir/symbols/lotus-gold/")),
            linked("حداقل", Some("/x")),
            linked("عیار", None),
            RawRow::default(),
        ];
        let sentinels = vec!["حداقل".to_string()];
        let profiles = profiles_from_rows(&rows, &sentinels);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "lotus-gold");
        assert_eq!(profiles[1].name, "عیار");
        assert_eq!(profiles[1].gold_weight_grams, 0.01);
    }

    #[test]
    fn catalog_is_unique() {
        let catalog = default_catalog();
        let mut symbols: Vec<_> = catalog.iter().map(|p| p.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), catalog.len());
    }
}
