//! Bracket intent types

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::policy::{BracketPrices, Side};

/// Protective levels, either explicit or as pip distances from entry
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BracketLevels {
    /// Explicit take-profit / stop-loss prices
    Prices {
        tp_price: Decimal,
        sl_price: Decimal,
    },
    /// Pip distances from the entry price, resolved direction-aware
    Distances {
        tp_pips: Decimal,
        sl_pips: Decimal,
        pip: Decimal,
    },
}

/// A simple order intent to be shaped into a venue bracket
#[derive(Debug, Clone, Deserialize)]
pub struct BracketIntent {
    pub side: Side,
    pub instrument: String,
    pub entry_price: Decimal,
    pub size: Decimal,
    #[serde(flatten)]
    pub levels: BracketLevels,
}

impl BracketIntent {
    /// Resolve the protective levels to absolute prices
    ///
    /// Distances are applied direction-aware: a long take-profit sits above
    /// entry and its stop below; a short is mirrored. Getting the sign
    /// wrong silently inverts the bracket, so both sides are unit-tested.
    pub fn resolve_levels(&self) -> BracketPrices {
        match &self.levels {
            BracketLevels::Prices { tp_price, sl_price } => BracketPrices {
                take_profit: *tp_price,
                stop_loss: *sl_price,
            },
            BracketLevels::Distances {
                tp_pips,
                sl_pips,
                pip,
            } => {
                let sign = self.side.sign();
                BracketPrices {
                    take_profit: self.entry_price + sign * tp_pips * pip,
                    stop_loss: self.entry_price - sign * sl_pips * pip,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn intent(side: Side, levels: BracketLevels) -> BracketIntent {
        BracketIntent {
            side,
            instrument: "EUR_USD".to_string(),
            entry_price: dec!(100),
            size: dec!(1),
            levels,
        }
    }

    #[test]
    fn test_buy_distances_resolve_above_and_below() {
        let intent = intent(
            Side::Long,
            BracketLevels::Distances {
                tp_pips: dec!(5),
                sl_pips: dec!(3),
                pip: dec!(1),
            },
        );
        let prices = intent.resolve_levels();
        assert_eq!(prices.take_profit, dec!(105));
        assert_eq!(prices.stop_loss, dec!(97));
    }

    #[test]
    fn test_sell_distances_resolve_mirrored() {
        let intent = intent(
            Side::Short,
            BracketLevels::Distances {
                tp_pips: dec!(5),
                sl_pips: dec!(3),
                pip: dec!(1),
            },
        );
        let prices = intent.resolve_levels();
        assert_eq!(prices.take_profit, dec!(95));
        assert_eq!(prices.stop_loss, dec!(103));
    }

    #[test]
    fn test_explicit_prices_pass_through() {
        let intent = intent(
            Side::Long,
            BracketLevels::Prices {
                tp_price: dec!(107.5),
                sl_price: dec!(96.25),
            },
        );
        let prices = intent.resolve_levels();
        assert_eq!(prices.take_profit, dec!(107.5));
        assert_eq!(prices.stop_loss, dec!(96.25));
    }

    #[test]
    fn test_intent_deserialize_with_prices() {
        let json = r#"{
            "side": "buy",
            "instrument": "EUR_USD",
            "entry_price": "1.2754",
            "size": "10000",
            "tp_price": "1.2782",
            "sl_price": "1.2739"
        }"#;
        let intent: BracketIntent = serde_json::from_str(json).unwrap();
        assert!(matches!(intent.levels, BracketLevels::Prices { .. }));
    }

    #[test]
    fn test_intent_deserialize_with_distances() {
        let json = r#"{
            "side": "sell",
            "instrument": "BTC-USD",
            "entry_price": "42000",
            "size": "0.001",
            "tp_pips": "500",
            "sl_pips": "300",
            "pip": "1"
        }"#;
        let intent: BracketIntent = serde_json::from_str(json).unwrap();
        let prices = intent.resolve_levels();
        assert_eq!(prices.take_profit, dec!(41500));
        assert_eq!(prices.stop_loss, dec!(42300));
    }
}
