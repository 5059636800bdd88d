//! Order guard
//!
//! Fail-closed gate in front of order submission: an order may only go out
//! once its protective prices have been computed. Disabled protection is a
//! fatal misconfiguration, not a soft path.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::PolicyConfig;
use crate::policy::{BracketPrices, OcoInputs, PolicyEngine, PolicyError, Side};

/// Generic order context handed to the guard by a strategy
#[derive(Debug, Clone, Deserialize)]
pub struct OrderContext {
    /// Entry price
    pub entry: Decimal,
    /// Trade direction ("buy"/"sell" and "long"/"short" both parse)
    pub side: Side,
    /// Instrument pip size
    pub pip: Decimal,
    /// Current ATR
    pub atr: Decimal,
    /// Model-confidence edge, signed -1..=+1; absent means neutral
    #[serde(default)]
    pub edge: Option<Decimal>,
    /// Account equity
    pub equity: Decimal,
    /// Currency value of one pip for the position size
    pub tick_value: Decimal,
}

/// Validates order contexts and computes their mandatory protection
#[derive(Debug)]
pub struct OrderGuard {
    engine: PolicyEngine,
}

impl OrderGuard {
    /// Build a guard from policy configuration
    ///
    /// Refuses construction outright when strict protection is off, and
    /// propagates engine construction failures (missing/bad formulas).
    pub fn new(cfg: &PolicyConfig) -> Result<Self, PolicyError> {
        if !cfg.strict_protection {
            return Err(PolicyError::ProtectionDisabled);
        }
        Ok(Self {
            engine: PolicyEngine::new(cfg)?,
        })
    }

    /// Compute the protective prices for an order, or fail the order
    pub fn protective_prices(&self, ctx: &OrderContext) -> Result<BracketPrices, PolicyError> {
        self.engine.compute(&OcoInputs {
            entry: ctx.entry,
            side: ctx.side,
            pip: ctx.pip,
            atr: ctx.atr,
            edge: ctx.edge.unwrap_or(Decimal::ZERO),
            equity: ctx.equity,
            tick_value: ctx.tick_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn guarded_config() -> PolicyConfig {
        PolicyConfig {
            tp_formula: Some("entry + side_sign * ATR_TP_MULT * atr".to_string()),
            sl_formula: Some("entry - side_sign * ATR_SL_MULT * atr".to_string()),
            ..PolicyConfig::default()
        }
    }

    fn context() -> OrderContext {
        OrderContext {
            entry: dec!(1.2000),
            side: Side::Long,
            pip: dec!(0.0001),
            atr: dec!(0.0020),
            edge: None,
            equity: dec!(10000),
            tick_value: dec!(1),
        }
    }

    #[test]
    fn test_disabled_protection_is_fatal() {
        let cfg = PolicyConfig {
            strict_protection: false,
            ..guarded_config()
        };
        assert!(matches!(
            OrderGuard::new(&cfg).unwrap_err(),
            PolicyError::ProtectionDisabled
        ));
    }

    #[test]
    fn test_missing_formula_propagates() {
        let cfg = PolicyConfig {
            tp_formula: None,
            ..guarded_config()
        };
        assert!(matches!(
            OrderGuard::new(&cfg).unwrap_err(),
            PolicyError::MissingFormula { .. }
        ));
    }

    #[test]
    fn test_protective_prices_for_long() {
        let guard = OrderGuard::new(&guarded_config()).unwrap();
        let prices = guard.protective_prices(&context()).unwrap();
        assert_eq!(prices.take_profit, dec!(1.2044));
        assert_eq!(prices.stop_loss, dec!(1.1976));
    }

    #[test]
    fn test_absent_edge_defaults_to_neutral() {
        let cfg = PolicyConfig {
            tp_formula: Some(
                "entry + side_sign * ATR_TP_MULT * atr * (1 + EDGE_WEIGHT_TP * edge)"
                    .to_string(),
            ),
            sl_formula: Some("entry - side_sign * ATR_SL_MULT * atr".to_string()),
            ..PolicyConfig::default()
        };
        let guard = OrderGuard::new(&cfg).unwrap();
        let neutral = guard.protective_prices(&context()).unwrap();
        let explicit = guard
            .protective_prices(&OrderContext {
                edge: Some(Decimal::ZERO),
                ..context()
            })
            .unwrap();
        assert_eq!(neutral, explicit);
    }

    #[test]
    fn test_order_context_deserialize() {
        let json = r#"{
            "entry": "1.2754",
            "side": "buy",
            "pip": "0.0001",
            "atr": "0.0018",
            "equity": "25000",
            "tick_value": "1.0"
        }"#;
        let ctx: OrderContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.side, Side::Long);
        assert!(ctx.edge.is_none());
    }
}
