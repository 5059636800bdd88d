//! Notification sink for protection events
//!
//! Watchdog and guardian report everything they do through one
//! [`Notifier`]. Events fan out over an mpsc channel to whatever is
//! listening (dashboard feeder, alerting) and are always mirrored to the
//! structured log.

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::broker::CloseReason;

/// A protection action or failure worth surfacing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionEvent {
    /// The watchdog restored a missing stop-loss leg
    StopRestored {
        trade_id: String,
        stop_loss: Decimal,
    },
    /// The watchdog reinstated a missing take-profit leg
    TargetReinstated {
        trade_id: String,
        take_profit: Decimal,
    },
    /// The guardian trailed the stop in the favorable direction
    StopTrailed {
        trade_id: String,
        from: Decimal,
        to: Decimal,
    },
    /// The guardian tightened the stop on a momentum reversal
    StopTightened { trade_id: String, to: Decimal },
    /// A trade was closed by a monitor
    TradeClosed {
        trade_id: String,
        reason: CloseReason,
    },
    /// A monitoring cycle (or one record in it) failed and was skipped
    CycleError { detail: String },
}

/// Sends protection events to subscribers and the log
#[derive(Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<ProtectionEvent>>,
}

impl Notifier {
    /// Notifier that forwards events to a channel
    pub fn new(tx: mpsc::Sender<ProtectionEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Notifier that only writes to the log
    pub fn log_only() -> Self {
        Self { tx: None }
    }

    /// Emit one event
    pub async fn emit(&self, event: ProtectionEvent) {
        match &event {
            ProtectionEvent::StopRestored {
                trade_id,
                stop_loss,
            } => {
                tracing::info!(%trade_id, %stop_loss, "restored missing stop-loss");
            }
            ProtectionEvent::TargetReinstated {
                trade_id,
                take_profit,
            } => {
                tracing::info!(%trade_id, %take_profit, "reinstated missing take-profit");
            }
            ProtectionEvent::StopTrailed { trade_id, from, to } => {
                tracing::info!(%trade_id, %from, %to, "trailed stop");
            }
            ProtectionEvent::StopTightened { trade_id, to } => {
                tracing::info!(%trade_id, %to, "tightened stop on momentum reversal");
            }
            ProtectionEvent::TradeClosed { trade_id, reason } => {
                tracing::info!(%trade_id, %reason, "closed trade");
            }
            ProtectionEvent::CycleError { detail } => {
                tracing::warn!(detail = %detail, "monitoring cycle error");
            }
        }

        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                tracing::warn!("protection event receiver dropped");
            }
        }
    }
}
