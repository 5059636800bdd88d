//! Broker abstraction consumed by the protection monitors
//!
//! The watchdog and guardian never talk to a venue directly; they read
//! snapshots and request mutations through this trait. The two live venue
//! clients implement it elsewhere; [`PaperBroker`] is the in-memory
//! implementation used by tests and paper mode.

mod paper;

pub use paper::PaperBroker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::Side;

/// Read-only snapshot of an open trade
///
/// Valid for one polling cycle; monitors never hold it across cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeView {
    /// Trade identifier
    pub id: String,
    /// Instrument the trade is in
    pub instrument: String,
    /// Trade direction
    pub side: Side,
    /// Position size in units
    pub units: Decimal,
    /// Average entry price
    pub entry_price: Decimal,
    /// Pending take-profit price, if any
    pub take_profit: Option<Decimal>,
    /// Pending stop-loss price, if any
    pub stop_loss: Option<Decimal>,
    /// Unrealized P/L in account currency
    pub unrealized_pnl: Decimal,
    /// When the trade was opened
    pub opened_at: DateTime<Utc>,
}

/// Why a trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// P/L sat inside the stale band past the configured timeout
    Stale,
    /// Operator-initiated close
    Manual,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Stale => write!(f, "stale"),
            CloseReason::Manual => write!(f, "manual"),
        }
    }
}

/// Venue boundary for the protection monitors
///
/// Implementations are responsible for their own serialization; the
/// monitors treat the broker as a thread-safe external service.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Current price for an instrument
    async fn price(&self, instrument: &str) -> anyhow::Result<Decimal>;

    /// All open trades for an instrument
    async fn list_open_trades(&self, instrument: &str) -> anyhow::Result<Vec<TradeView>>;

    /// Idempotently create or replace the protective legs for a trade
    ///
    /// `take_profit = None` leaves the trade without a target (permitted
    /// only when policy allows TP removal).
    async fn ensure_oco(
        &self,
        trade_id: &str,
        take_profit: Option<Decimal>,
        stop_loss: Decimal,
    ) -> anyhow::Result<()>;

    /// Replace the stop-loss price of a trade
    async fn modify_stop(&self, trade_id: &str, new_stop: Decimal) -> anyhow::Result<()>;

    /// Close a trade at market
    async fn close_trade(&self, trade_id: &str, reason: CloseReason) -> anyhow::Result<()>;

    /// Momentum-reversal signal from the external detector
    async fn momentum_flip_detected(&self, instrument: &str) -> anyhow::Result<bool>;
}
