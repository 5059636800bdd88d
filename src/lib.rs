//! oco-sentinel: mandatory OCO bracket protection for live trading
//!
//! This library provides the core components for:
//! - Policy-driven TP/SL computation from volatility, risk budget, and model edge
//! - A fail-closed order guard that refuses unprotected orders
//! - Venue-agnostic bracket shaping for both bracket-order idioms
//! - A per-instrument watchdog that restores missing protective legs
//! - A per-trade trailing-stop guardian with stale-trade kills
//! - Structured logging and protection metrics

pub mod bracket;
pub mod broker;
pub mod cli;
pub mod config;
pub mod guard;
pub mod guardian;
pub mod notify;
pub mod policy;
pub mod telemetry;
pub mod watchdog;
