//! Configuration types for oco-sentinel

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub guardian: GuardianConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Protection policy configuration
///
/// The TP/SL formulas are mandatory whenever `strict_protection` is on:
/// `PolicyEngine::new` fails at construction if either is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Refuse every order that cannot carry full OCO protection
    #[serde(default = "default_true")]
    pub strict_protection: bool,

    /// Fraction of account equity risked per trade
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: Decimal,

    /// Hard floor on stop-loss distance in pips
    #[serde(default = "default_min_sl_pips")]
    pub min_sl_pips: Decimal,

    /// Hard ceiling on stop-loss distance in pips
    #[serde(default = "default_max_sl_pips")]
    pub max_sl_pips: Decimal,

    /// ATR multiplier for the take-profit distance
    #[serde(default = "default_atr_tp_mult")]
    pub atr_tp_mult: Decimal,

    /// ATR multiplier for the stop-loss distance
    #[serde(default = "default_atr_sl_mult")]
    pub atr_sl_mult: Decimal,

    /// Weight of the model-confidence edge on the take-profit distance
    #[serde(default = "default_edge_weight_tp")]
    pub edge_weight_tp: Decimal,

    /// Weight of the model-confidence edge on the stop-loss distance
    #[serde(default = "default_edge_weight_sl")]
    pub edge_weight_sl: Decimal,

    /// Fixed take-profit distance in pips (0 = volatility-based sizing)
    #[serde(default)]
    pub fixed_tp_pips: Decimal,

    /// Fixed stop-loss distance in pips (0 = volatility-based sizing)
    #[serde(default)]
    pub fixed_sl_pips: Decimal,

    /// Take-profit formula, evaluated in the sandboxed expression scope
    pub tp_formula: Option<String>,

    /// Stop-loss formula, evaluated in the sandboxed expression scope
    pub sl_formula: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_protection: true,
            risk_fraction: dec!(0.005),
            min_sl_pips: dec!(5),
            max_sl_pips: dec!(30),
            atr_tp_mult: dec!(2.2),
            atr_sl_mult: dec!(1.2),
            edge_weight_tp: dec!(0.6),
            edge_weight_sl: dec!(0.4),
            fixed_tp_pips: Decimal::ZERO,
            fixed_sl_pips: Decimal::ZERO,
            tp_formula: None,
            sl_formula: None,
        }
    }
}

/// OCO watchdog configuration
///
/// The restoration offsets are defensive defaults; they are not
/// calibrated per instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// Seconds between verification cycles
    #[serde(default = "default_watchdog_heartbeat")]
    pub heartbeat_secs: u64,

    /// A stop-loss leg must always exist and is restored when missing
    #[serde(default = "default_true")]
    pub sl_immutable: bool,

    /// A strategy may intentionally drop its take-profit leg
    #[serde(default = "default_true")]
    pub allow_tp_remove: bool,

    /// Pip offset from current price for a restored stop-loss
    #[serde(default = "default_restore_sl_pips")]
    pub restore_sl_pips: Decimal,

    /// Pip offset from current price for a reinstated take-profit
    #[serde(default = "default_restore_tp_pips")]
    pub restore_tp_pips: Decimal,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 2,
            sl_immutable: true,
            allow_tp_remove: true,
            restore_sl_pips: dec!(10),
            restore_tp_pips: dec!(12),
        }
    }
}

/// Trailing guardian configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GuardianConfig {
    /// Seconds between heartbeats
    #[serde(default = "default_guardian_heartbeat")]
    pub heartbeat_secs: u64,

    /// Pip profit at which trailing activates
    #[serde(default = "default_trail_activation_pips")]
    pub trail_activation_pips: Decimal,

    /// Minimum pip improvement before the stop is actually moved
    #[serde(default = "default_trail_step_pips")]
    pub trail_step_pips: Decimal,

    /// Pip distance the trailing stop keeps behind current price
    #[serde(default = "default_max_giveback_pips")]
    pub max_giveback_pips: Decimal,

    /// Force-close a trade whose P/L has not moved for this many minutes
    #[serde(default = "default_stale_kill_minutes")]
    pub stale_kill_minutes: u64,

    /// Tighten the stop by one pip when a momentum reversal fires
    #[serde(default = "default_true")]
    pub escalate_on_momentum: bool,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 1,
            trail_activation_pips: dec!(10),
            trail_step_pips: dec!(2),
            max_giveback_pips: dec!(6),
            stale_kill_minutes: 45,
            escalate_on_momentum: true,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_risk_fraction() -> Decimal {
    dec!(0.005)
}
fn default_min_sl_pips() -> Decimal {
    dec!(5)
}
fn default_max_sl_pips() -> Decimal {
    dec!(30)
}
fn default_atr_tp_mult() -> Decimal {
    dec!(2.2)
}
fn default_atr_sl_mult() -> Decimal {
    dec!(1.2)
}
fn default_edge_weight_tp() -> Decimal {
    dec!(0.6)
}
fn default_edge_weight_sl() -> Decimal {
    dec!(0.4)
}
fn default_watchdog_heartbeat() -> u64 {
    2
}
fn default_restore_sl_pips() -> Decimal {
    dec!(10)
}
fn default_restore_tp_pips() -> Decimal {
    dec!(12)
}
fn default_guardian_heartbeat() -> u64 {
    1
}
fn default_trail_activation_pips() -> Decimal {
    dec!(10)
}
fn default_trail_step_pips() -> Decimal {
    dec!(2)
}
fn default_max_giveback_pips() -> Decimal {
    dec!(6)
}
fn default_stale_kill_minutes() -> u64 {
    45
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
