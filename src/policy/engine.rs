//! Policy engine implementation

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::config::PolicyConfig;

use super::expr::Expr;
use super::types::{BracketPrices, OcoInputs, PolicyError, Side};

/// Variable names visible to policy formulas
///
/// Anything else is rejected when the formula is parsed.
pub const SCOPE_VARS: &[&str] = &[
    "entry",
    "side_sign",
    "pip",
    "atr",
    "edge",
    "ATR_TP_MULT",
    "ATR_SL_MULT",
    "EDGE_WEIGHT_TP",
    "EDGE_WEIGHT_SL",
    "MAX_SL_PIPS",
    "MIN_SL_PIPS",
    "FIXED_TP_PIPS",
    "FIXED_SL_PIPS",
    "risk_pips_cap",
];

/// Computes validated protective price pairs from the configured formulas
#[derive(Debug)]
pub struct PolicyEngine {
    cfg: PolicyConfig,
    tp_expr: Expr,
    sl_expr: Expr,
}

impl PolicyEngine {
    /// Build an engine from configuration
    ///
    /// Fails here, not at first use, when either formula is missing or
    /// does not parse.
    pub fn new(cfg: &PolicyConfig) -> Result<Self, PolicyError> {
        let tp_src = cfg
            .tp_formula
            .as_deref()
            .ok_or(PolicyError::MissingFormula {
                which: "take-profit",
            })?;
        let sl_src = cfg
            .sl_formula
            .as_deref()
            .ok_or(PolicyError::MissingFormula { which: "stop-loss" })?;

        let tp_expr = Expr::parse(tp_src, SCOPE_VARS).map_err(|source| {
            PolicyError::BadFormula {
                which: "take-profit",
                source,
            }
        })?;
        let sl_expr = Expr::parse(sl_src, SCOPE_VARS).map_err(|source| {
            PolicyError::BadFormula {
                which: "stop-loss",
                source,
            }
        })?;

        Ok(Self {
            cfg: cfg.clone(),
            tp_expr,
            sl_expr,
        })
    }

    /// Compute the protective price pair for one order
    ///
    /// Pip and ATR are clamped to positive floors before any ratio is
    /// derived. The result must satisfy `sl < entry < tp` for longs and
    /// `tp < entry < sl` for shorts; a violation is fatal for the order.
    pub fn compute(&self, inputs: &OcoInputs) -> Result<BracketPrices, PolicyError> {
        let pip = inputs.pip.max(dec!(0.0000000001));
        let atr = inputs.atr.max(pip);
        let tick_value = inputs.tick_value.max(dec!(0.000000001));
        let equity = inputs.equity.max(Decimal::ZERO);

        // Maximum stop distance, in pips, the risk budget allows
        let risk_pips_cap = self.cfg.risk_fraction * equity / tick_value;

        let mut scope: HashMap<&str, Decimal> = HashMap::with_capacity(SCOPE_VARS.len());
        scope.insert("entry", inputs.entry);
        scope.insert("side_sign", inputs.side.sign());
        scope.insert("pip", pip);
        scope.insert("atr", atr);
        scope.insert("edge", inputs.edge);
        scope.insert("ATR_TP_MULT", self.cfg.atr_tp_mult);
        scope.insert("ATR_SL_MULT", self.cfg.atr_sl_mult);
        scope.insert("EDGE_WEIGHT_TP", self.cfg.edge_weight_tp);
        scope.insert("EDGE_WEIGHT_SL", self.cfg.edge_weight_sl);
        scope.insert("MAX_SL_PIPS", self.cfg.max_sl_pips);
        scope.insert("MIN_SL_PIPS", self.cfg.min_sl_pips);
        scope.insert("FIXED_TP_PIPS", self.cfg.fixed_tp_pips);
        scope.insert("FIXED_SL_PIPS", self.cfg.fixed_sl_pips);
        scope.insert("risk_pips_cap", risk_pips_cap);

        let take_profit = self.tp_expr.eval(&scope).map_err(|source| {
            PolicyError::EvalFailed {
                which: "take-profit",
                source,
            }
        })?;
        let stop_loss = self.sl_expr.eval(&scope).map_err(|source| {
            PolicyError::EvalFailed {
                which: "stop-loss",
                source,
            }
        })?;

        let ordered = match inputs.side {
            Side::Long => stop_loss < inputs.entry && inputs.entry < take_profit,
            Side::Short => take_profit < inputs.entry && inputs.entry < stop_loss,
        };
        if !ordered {
            return Err(PolicyError::InvalidBracket {
                side: inputs.side,
                entry: inputs.entry,
                take_profit,
                stop_loss,
            });
        }

        Ok(BracketPrices {
            take_profit,
            stop_loss,
        })
    }
}
