//! Policy types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::expr::ExprError;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Long / buy
    #[serde(alias = "buy")]
    Long,
    /// Short / sell
    #[serde(alias = "sell")]
    Short,
}

impl Side {
    /// Direction sign: +1 for long, -1 for short
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => dec!(1),
            Side::Short => dec!(-1),
        }
    }

    /// The opposing side (used for protective legs)
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

impl FromStr for Side {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(Side::Long),
            "sell" | "short" => Ok(Side::Short),
            other => Err(PolicyError::UnknownSide(other.to_string())),
        }
    }
}

/// Inputs for one protective-price computation
///
/// Built fresh per order; never mutated.
#[derive(Debug, Clone)]
pub struct OcoInputs {
    /// Entry price
    pub entry: Decimal,
    /// Trade direction
    pub side: Side,
    /// Smallest meaningful price increment for the instrument
    pub pip: Decimal,
    /// Average true range volatility measure
    pub atr: Decimal,
    /// Model-confidence edge, signed in -1..=+1 (0 = neutral)
    pub edge: Decimal,
    /// Account equity in account currency
    pub equity: Decimal,
    /// Currency value of a one-pip move for the position size
    pub tick_value: Decimal,
}

/// Validated protective price pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPrices {
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

/// Policy and guard errors
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Strict protection is off; the guard refuses all orders
    #[error("strict protection is disabled; refusing to place an unprotected order")]
    ProtectionDisabled,
    /// A mandatory formula is absent from configuration
    #[error("{which} formula missing from policy configuration")]
    MissingFormula { which: &'static str },
    /// A formula failed to parse
    #[error("{which} formula invalid: {source}")]
    BadFormula {
        which: &'static str,
        source: ExprError,
    },
    /// A formula failed to evaluate
    #[error("{which} formula evaluation failed: {source}")]
    EvalFailed {
        which: &'static str,
        source: ExprError,
    },
    /// Computed prices violate the bracket ordering invariant
    #[error("{side} bracket invalid (tp={take_profit} entry={entry} sl={stop_loss})")]
    InvalidBracket {
        side: Side,
        entry: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    },
    /// Unrecognized side string
    #[error("unknown side '{0}' (expected buy/sell or long/short)")]
    UnknownSide(String),
}
