//! OCO watchdog
//!
//! One watchdog per instrument continuously verifies that every open
//! trade carries its protective legs and restores any missing leg at a
//! conservative offset from current price. A failed cycle is reported and
//! skipped; nothing short of an explicit stop terminates monitoring.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::broker::{Broker, TradeView};
use crate::config::WatchdogConfig;
use crate::notify::{Notifier, ProtectionEvent};
use crate::telemetry::{bump, ProtectionCounter};

/// Restores missing protective legs for all open trades of one instrument
pub struct OcoWatchdog<B> {
    broker: Arc<B>,
    instrument: String,
    pip: Decimal,
    cfg: WatchdogConfig,
    notifier: Notifier,
}

impl<B: Broker + 'static> OcoWatchdog<B> {
    pub fn new(
        broker: Arc<B>,
        instrument: impl Into<String>,
        pip: Decimal,
        cfg: WatchdogConfig,
        notifier: Notifier,
    ) -> Self {
        Self {
            broker,
            instrument: instrument.into(),
            pip,
            cfg,
            notifier,
        }
    }

    /// Run the watchdog on a background task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Poll until the shutdown signal flips
    ///
    /// The signal is cooperative: it is checked once per iteration and an
    /// in-flight cycle is allowed to complete.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.heartbeat_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(instrument = %self.instrument, "watchdog started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.cycle().await {
                        tracing::warn!(instrument = %self.instrument, error = %e, "watchdog cycle failed");
                        bump(ProtectionCounter::CycleErrors);
                        self.notifier
                            .emit(ProtectionEvent::CycleError {
                                detail: e.to_string(),
                            })
                            .await;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(instrument = %self.instrument, "watchdog stopping");
                        return;
                    }
                }
            }
        }
    }

    /// One verification pass over all open trades
    ///
    /// A malformed or failing record is reported and skipped without
    /// aborting the rest of the pass.
    pub async fn cycle(&self) -> anyhow::Result<()> {
        let trades = self.broker.list_open_trades(&self.instrument).await?;
        for trade in trades {
            if let Err(e) = self.check_trade(&trade).await {
                tracing::warn!(trade_id = %trade.id, error = %e, "trade check failed");
                bump(ProtectionCounter::CycleErrors);
                self.notifier
                    .emit(ProtectionEvent::CycleError {
                        detail: format!("trade {}: {e}", trade.id),
                    })
                    .await;
            }
        }
        Ok(())
    }

    async fn check_trade(&self, trade: &TradeView) -> anyhow::Result<()> {
        let missing_sl = trade.stop_loss.is_none() && self.cfg.sl_immutable;
        let missing_tp = trade.take_profit.is_none() && !self.cfg.allow_tp_remove;
        if !missing_sl && !missing_tp {
            return Ok(());
        }

        let price = self.broker.price(&self.instrument).await?;
        let sign = trade.side.sign();
        let restored_sl = price - sign * self.cfg.restore_sl_pips * self.pip;
        let restored_tp = price + sign * self.cfg.restore_tp_pips * self.pip;

        let stop_loss = trade.stop_loss.unwrap_or(restored_sl);
        let take_profit = if trade.take_profit.is_some() || !self.cfg.allow_tp_remove {
            Some(trade.take_profit.unwrap_or(restored_tp))
        } else {
            // Strategy is permitted to run without a target; keep the stop only.
            None
        };

        self.broker
            .ensure_oco(&trade.id, take_profit, stop_loss)
            .await?;

        if missing_sl {
            bump(ProtectionCounter::StopRestored);
            self.notifier
                .emit(ProtectionEvent::StopRestored {
                    trade_id: trade.id.clone(),
                    stop_loss,
                })
                .await;
        }
        if missing_tp {
            bump(ProtectionCounter::TargetReinstated);
            self.notifier
                .emit(ProtectionEvent::TargetReinstated {
                    trade_id: trade.id.clone(),
                    take_profit: restored_tp,
                })
                .await;
        }
        Ok(())
    }
}
