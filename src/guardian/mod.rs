//! Trailing-stop guardian
//!
//! One guardian owns one open trade from entry until close. Each
//! heartbeat it marks the trade to market, trails the stop once profit
//! clears the activation threshold (never loosening, and only by more
//! than the configured step), tightens on momentum reversals, and
//! force-closes trades whose P/L has gone stale.
//!
//! Broker errors are deliberately not handled here: they end the guardian
//! and are the supervisor's problem, never the process's.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::broker::{Broker, CloseReason};
use crate::config::GuardianConfig;
use crate::notify::{Notifier, ProtectionEvent};
use crate::policy::Side;
use crate::telemetry::{bump, ProtectionCounter};

/// P/L band (in pips) inside which a trade counts as making no progress
const STALE_BAND_PIPS: Decimal = dec!(2);

/// Mutable per-trade state, owned by exactly one guardian
#[derive(Debug, Clone)]
pub struct TradeState {
    pub id: String,
    pub side: Side,
    pub entry: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

/// How a guardian loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardianExit {
    /// Cooperative shutdown; the trade is still open
    Stopped,
    /// The trade was force-closed as stale
    StaleKilled,
}

/// Supervises one open trade until it closes
pub struct TrailingGuardian<B> {
    broker: Arc<B>,
    instrument: String,
    pip: Decimal,
    cfg: GuardianConfig,
    notifier: Notifier,
    state: TradeState,
}

impl<B: Broker + 'static> TrailingGuardian<B> {
    pub fn new(
        broker: Arc<B>,
        instrument: impl Into<String>,
        pip: Decimal,
        cfg: GuardianConfig,
        notifier: Notifier,
        state: TradeState,
    ) -> Self {
        Self {
            broker,
            instrument: instrument.into(),
            pip,
            cfg,
            notifier,
            state,
        }
    }

    /// Run the guardian on a background task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<anyhow::Result<GuardianExit>> {
        tokio::spawn(self.run(shutdown))
    }

    /// Heartbeat until the trade closes or the shutdown signal flips
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<GuardianExit> {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.heartbeat_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let stale_after = Duration::from_secs(self.cfg.stale_kill_minutes * 60);
        let mut last_progress = Instant::now();
        let mut peak_pips = Decimal::ZERO;

        tracing::info!(trade_id = %self.state.id, "guardian started");
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(trade_id = %self.state.id, "guardian stopping");
                        return Ok(GuardianExit::Stopped);
                    }
                    continue;
                }
            }

            let price = self.broker.price(&self.instrument).await?;
            let sign = self.state.side.sign();
            let pnl_pips = sign * (price - self.state.entry) / self.pip;
            peak_pips = peak_pips.max(pnl_pips);

            if pnl_pips >= self.cfg.trail_activation_pips {
                self.trail_stop(price, sign, peak_pips).await?;
            }

            if pnl_pips.abs() < STALE_BAND_PIPS {
                if last_progress.elapsed() >= stale_after {
                    self.broker
                        .close_trade(&self.state.id, CloseReason::Stale)
                        .await?;
                    bump(ProtectionCounter::StaleKilled);
                    self.notifier
                        .emit(ProtectionEvent::TradeClosed {
                            trade_id: self.state.id.clone(),
                            reason: CloseReason::Stale,
                        })
                        .await;
                    return Ok(GuardianExit::StaleKilled);
                }
            } else {
                last_progress = Instant::now();
            }

            if self.cfg.escalate_on_momentum
                && self.broker.momentum_flip_detected(&self.instrument).await?
            {
                self.tighten_stop(sign).await?;
            }
        }
    }

    /// Move the stop toward price, favorable-only and step-gated
    async fn trail_stop(
        &mut self,
        price: Decimal,
        sign: Decimal,
        peak_pips: Decimal,
    ) -> anyhow::Result<()> {
        let trail_base = price - sign * self.cfg.max_giveback_pips * self.pip;
        let candidate = match self.state.side {
            Side::Long => self.state.stop_loss.max(trail_base),
            Side::Short => self.state.stop_loss.min(trail_base),
        };
        let step = self.cfg.trail_step_pips * self.pip;
        let moved_enough = match self.state.side {
            Side::Long => candidate > self.state.stop_loss + step,
            Side::Short => candidate < self.state.stop_loss - step,
        };
        if !moved_enough {
            return Ok(());
        }

        self.broker.modify_stop(&self.state.id, candidate).await?;
        bump(ProtectionCounter::StopTrailed);
        tracing::debug!(
            trade_id = %self.state.id,
            %peak_pips,
            from = %self.state.stop_loss,
            to = %candidate,
            "stop trailed"
        );
        self.notifier
            .emit(ProtectionEvent::StopTrailed {
                trade_id: self.state.id.clone(),
                from: self.state.stop_loss,
                to: candidate,
            })
            .await;
        self.state.stop_loss = candidate;
        Ok(())
    }

    /// Tighten by one pip in the trade's favor; trailing stays active
    async fn tighten_stop(&mut self, sign: Decimal) -> anyhow::Result<()> {
        let tightened = self.state.stop_loss + sign * self.pip;
        self.broker.modify_stop(&self.state.id, tightened).await?;
        bump(ProtectionCounter::StopTightened);
        self.notifier
            .emit(ProtectionEvent::StopTightened {
                trade_id: self.state.id.clone(),
                to: tightened,
            })
            .await;
        self.state.stop_loss = tightened;
        Ok(())
    }

    /// Current trade state (for supervisors and tests)
    pub fn state(&self) -> &TradeState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{PaperBroker, TradeView};
    use chrono::Utc;

    fn long_state() -> TradeState {
        TradeState {
            id: "t1".to_string(),
            side: Side::Long,
            entry: dec!(1.2000),
            take_profit: dec!(1.2030),
            stop_loss: dec!(1.1990),
        }
    }

    async fn broker_with_trade(price: Decimal) -> Arc<PaperBroker> {
        let broker = Arc::new(PaperBroker::new(price));
        broker
            .open_trade(TradeView {
                id: "t1".to_string(),
                instrument: "EUR_USD".to_string(),
                side: Side::Long,
                units: dec!(10000),
                entry_price: dec!(1.2000),
                take_profit: Some(dec!(1.2030)),
                stop_loss: Some(dec!(1.1990)),
                unrealized_pnl: Decimal::ZERO,
                opened_at: Utc::now(),
            })
            .await;
        broker
    }

    fn guardian(
        broker: Arc<PaperBroker>,
        cfg: GuardianConfig,
    ) -> TrailingGuardian<PaperBroker> {
        TrailingGuardian::new(
            broker,
            "EUR_USD",
            dec!(0.0001),
            cfg,
            Notifier::log_only(),
            long_state(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_never_loosened() {
        let broker = broker_with_trade(dec!(1.2000)).await;
        // Price spikes then retreats: the trail must not follow back down.
        broker
            .push_prices([dec!(1.2015), dec!(1.2008), dec!(1.2006)])
            .await;
        let cfg = GuardianConfig {
            escalate_on_momentum: false,
            ..GuardianConfig::default()
        };
        let g = guardian(Arc::clone(&broker), cfg);

        let (tx, rx) = watch::channel(false);
        let handle = g.spawn(rx);
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(true).unwrap();
        let exit = handle.await.unwrap().unwrap();

        assert_eq!(exit, GuardianExit::Stopped);
        let calls = broker.modify_stop_calls().await;
        // One trail to 1.2015 - 6 pips = 1.2009; the retreat never lowers it.
        assert_eq!(calls, vec![("t1".to_string(), dec!(1.2009))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_momentum_flip_tightens_one_pip() {
        let broker = broker_with_trade(dec!(1.2005)).await;
        broker.arm_momentum_flip().await;
        let g = guardian(Arc::clone(&broker), GuardianConfig::default());

        let (tx, rx) = watch::channel(false);
        let handle = g.spawn(rx);
        tokio::time::sleep(Duration::from_secs(4)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        // Below activation, so the only move is the one-pip tighten.
        let calls = broker.modify_stop_calls().await;
        assert_eq!(calls, vec![("t1".to_string(), dec!(1.1991))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_disabled_ignores_flip() {
        let broker = broker_with_trade(dec!(1.2005)).await;
        broker.arm_momentum_flip().await;
        let cfg = GuardianConfig {
            escalate_on_momentum: false,
            ..GuardianConfig::default()
        };
        let g = guardian(Arc::clone(&broker), cfg);

        let (tx, rx) = watch::channel(false);
        let handle = g.spawn(rx);
        tokio::time::sleep(Duration::from_secs(4)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert!(broker.modify_stop_calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_broker_error_ends_guardian() {
        let broker = Arc::new(PaperBroker::new(dec!(1.2005)));
        // No trade registered: the momentum-driven modify_stop will fail.
        broker.arm_momentum_flip().await;
        let g = guardian(Arc::clone(&broker), GuardianConfig::default());

        let (_tx, rx) = watch::channel(false);
        let result = g.spawn(rx).await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_side_trails_downward() {
        let broker = Arc::new(PaperBroker::new(dec!(1.2000)));
        broker
            .open_trade(TradeView {
                id: "s1".to_string(),
                instrument: "EUR_USD".to_string(),
                side: Side::Short,
                units: dec!(10000),
                entry_price: dec!(1.2000),
                take_profit: Some(dec!(1.1970)),
                stop_loss: Some(dec!(1.2010)),
                unrealized_pnl: Decimal::ZERO,
                opened_at: Utc::now(),
            })
            .await;
        broker.push_prices([dec!(1.1985)]).await;
        let cfg = GuardianConfig {
            escalate_on_momentum: false,
            ..GuardianConfig::default()
        };
        let g = TrailingGuardian::new(
            Arc::clone(&broker),
            "EUR_USD",
            dec!(0.0001),
            cfg,
            Notifier::log_only(),
            TradeState {
                id: "s1".to_string(),
                side: Side::Short,
                entry: dec!(1.2000),
                take_profit: dec!(1.1970),
                stop_loss: dec!(1.2010),
            },
        );

        let (tx, rx) = watch::channel(false);
        let handle = g.spawn(rx);
        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        // 15 pips in profit; stop trails to 1.1985 + 6 pips = 1.1991.
        let calls = broker.modify_stop_calls().await;
        assert_eq!(calls, vec![("s1".to_string(), dec!(1.1991))]);
    }
}
