// src/units.rs
//! Named unit conversions shared by the record builder and the valuation engine.

/// Rials per toman. The fund table quotes tomans, valuation works in rials.
pub const RIAL_PER_TOMAN: f64 = 10.0;

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Gold fraction of 18 karat metal.
pub const PURITY_18K: f64 = 0.750;

/// Multiplier lifting an 18 karat gram price to a 24 karat one.
pub const KARAT_18_TO_24: f64 = 24.0 / 18.0;

pub const FULL_COIN_GRAMS: f64 = 8.133;
pub const HALF_COIN_GRAMS: f64 = 4.068;
pub const QUARTER_COIN_GRAMS: f64 = 2.034;

/// Gold weight backing one unit of a gold fund, in grams of 24k gold.
pub const FUND_UNIT_GOLD_GRAMS: f64 = 0.01;

pub fn toman_to_rial(tomans: f64) -> f64 {
    tomans * RIAL_PER_TOMAN
}

pub fn rial_to_toman(rials: f64) -> f64 {
    rials / RIAL_PER_TOMAN
}

/// Local-currency price of one gram of pure gold implied by the global ounce price.
pub fn global_gram_price(ounce_usd: f64, usd_rate: f64, troy_ounce_grams: f64) -> f64 {
    (ounce_usd * usd_rate) / troy_ounce_grams
}

/// Converts a gram price of 24k gold to the price of metal with the given purity.
pub fn apply_purity(pure_gram_price: f64, purity: f64) -> f64 {
    pure_gram_price * purity
}

pub fn karat18_to_24(gram_price_18k: f64) -> f64 {
    gram_price_18k * KARAT_18_TO_24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toman_rial_scale() {
        assert_eq!(toman_to_rial(1_234.0), 12_340.0);
        assert_eq!(rial_to_toman(12_340.0), 1_234.0);
    }

    #[test]
    fn global_gram_price_uses_troy_ounce() {
        let gram = global_gram_price(2_000.0, 50.0, TROY_OUNCE_GRAMS);
        assert!((gram - 3_215.7).abs() < 0.1);
        assert!((apply_purity(gram, PURITY_18K) - 2_411.8).abs() < 0.1);
    }

    #[test]
    fn eighteen_to_twenty_four_karat() {
        assert!((karat18_to_24(1_000.0) - 1_333.333).abs() < 0.001);
    }
}
