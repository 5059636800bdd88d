//! Paper broker with scriptable prices and call accounting
//!
//! Backs the paper mode and every monitor test: prices can be scripted
//! tick by tick, and all protective mutations are recorded for
//! inspection.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Broker, CloseReason, TradeView};

struct Inner {
    price_script: VecDeque<Decimal>,
    last_price: Decimal,
    trades: HashMap<String, TradeView>,
    momentum_flip: bool,
    fail_listing: bool,
    ensure_oco_calls: Vec<(String, Option<Decimal>, Decimal)>,
    modify_stop_calls: Vec<(String, Decimal)>,
    closed: Vec<(String, CloseReason)>,
}

/// In-memory broker for tests and paper mode
pub struct PaperBroker {
    inner: Arc<RwLock<Inner>>,
}

impl PaperBroker {
    /// Create a broker quoting `initial_price` until the script advances it
    pub fn new(initial_price: Decimal) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                price_script: VecDeque::new(),
                last_price: initial_price,
                trades: HashMap::new(),
                momentum_flip: false,
                fail_listing: false,
                ensure_oco_calls: vec![],
                modify_stop_calls: vec![],
                closed: vec![],
            })),
        }
    }

    /// Queue prices to be served one per `price` call; the last sticks
    pub async fn push_prices(&self, prices: impl IntoIterator<Item = Decimal>) {
        let mut inner = self.inner.write().await;
        inner.price_script.extend(prices);
    }

    /// Register an open trade
    pub async fn open_trade(&self, trade: TradeView) {
        let mut inner = self.inner.write().await;
        inner.trades.insert(trade.id.clone(), trade);
    }

    /// Arm the momentum-reversal latch; it fires on the next check
    pub async fn arm_momentum_flip(&self) {
        self.inner.write().await.momentum_flip = true;
    }

    /// Make `list_open_trades` fail until cleared
    pub async fn set_fail_listing(&self, fail: bool) {
        self.inner.write().await.fail_listing = fail;
    }

    /// Recorded ensure-OCO calls: (trade_id, take_profit, stop_loss)
    pub async fn ensure_oco_calls(&self) -> Vec<(String, Option<Decimal>, Decimal)> {
        self.inner.read().await.ensure_oco_calls.clone()
    }

    /// Recorded stop modifications: (trade_id, new_stop)
    pub async fn modify_stop_calls(&self) -> Vec<(String, Decimal)> {
        self.inner.read().await.modify_stop_calls.clone()
    }

    /// Recorded closes: (trade_id, reason)
    pub async fn closed_trades(&self) -> Vec<(String, CloseReason)> {
        self.inner.read().await.closed.clone()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn price(&self, _instrument: &str) -> anyhow::Result<Decimal> {
        let mut inner = self.inner.write().await;
        if let Some(next) = inner.price_script.pop_front() {
            inner.last_price = next;
        }
        Ok(inner.last_price)
    }

    async fn list_open_trades(&self, instrument: &str) -> anyhow::Result<Vec<TradeView>> {
        let inner = self.inner.read().await;
        if inner.fail_listing {
            anyhow::bail!("simulated listing outage");
        }
        let price = inner.last_price;
        Ok(inner
            .trades
            .values()
            .filter(|t| t.instrument == instrument)
            .cloned()
            .map(|mut t| {
                t.unrealized_pnl = t.side.sign() * (price - t.entry_price) * t.units;
                t
            })
            .collect())
    }

    async fn ensure_oco(
        &self,
        trade_id: &str,
        take_profit: Option<Decimal>,
        stop_loss: Decimal,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .ensure_oco_calls
            .push((trade_id.to_string(), take_profit, stop_loss));
        let trade = inner
            .trades
            .get_mut(trade_id)
            .ok_or_else(|| anyhow::anyhow!("unknown trade {trade_id}"))?;
        trade.take_profit = take_profit;
        trade.stop_loss = Some(stop_loss);
        Ok(())
    }

    async fn modify_stop(&self, trade_id: &str, new_stop: Decimal) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .modify_stop_calls
            .push((trade_id.to_string(), new_stop));
        let trade = inner
            .trades
            .get_mut(trade_id)
            .ok_or_else(|| anyhow::anyhow!("unknown trade {trade_id}"))?;
        trade.stop_loss = Some(new_stop);
        Ok(())
    }

    async fn close_trade(&self, trade_id: &str, reason: CloseReason) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .trades
            .remove(trade_id)
            .ok_or_else(|| anyhow::anyhow!("unknown trade {trade_id}"))?;
        inner.closed.push((trade_id.to_string(), reason));
        Ok(())
    }

    async fn momentum_flip_detected(&self, _instrument: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let fired = inner.momentum_flip;
        inner.momentum_flip = false;
        Ok(fired)
    }
}
