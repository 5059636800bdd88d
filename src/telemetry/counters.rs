//! Protection action counters

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum ProtectionCounter {
    /// Stop-loss legs restored by the watchdog
    StopRestored,
    /// Take-profit legs reinstated by the watchdog
    TargetReinstated,
    /// Stops trailed by the guardian
    StopTrailed,
    /// Stops tightened on momentum escalation
    StopTightened,
    /// Trades force-closed as stale
    StaleKilled,
    /// Monitoring cycles that failed and were skipped
    CycleErrors,
}

/// Increment a protection counter
pub fn bump(counter: ProtectionCounter) {
    let name = match counter {
        ProtectionCounter::StopRestored => "oco_sentinel_sl_restored_total",
        ProtectionCounter::TargetReinstated => "oco_sentinel_tp_reinstated_total",
        ProtectionCounter::StopTrailed => "oco_sentinel_stop_trailed_total",
        ProtectionCounter::StopTightened => "oco_sentinel_stop_tightened_total",
        ProtectionCounter::StaleKilled => "oco_sentinel_stale_killed_total",
        ProtectionCounter::CycleErrors => "oco_sentinel_cycle_errors_total",
    };
    metrics::counter!(name).increment(1);
}
