//! Prometheus metrics for backtest runs.
//!
//! This module provides metrics for:
//! - Run and probability-source latency
//! - Games processed and decisions by status
//! - Flagged games by reason
//! - Circuit breaker transitions

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::backtest::{DecisionStatus, FlagReason};
use crate::risk::RiskMode;

// === Metric Name Constants ===

/// Whole-run latency metric name.
pub const METRIC_RUN_LATENCY: &str = "backtest_run_latency_ms";
/// Probability source latency metric name.
pub const METRIC_PROBABILITY_LATENCY: &str = "probability_source_latency_ms";
/// Games processed counter metric name.
pub const METRIC_GAMES_PROCESSED: &str = "games_processed_total";
/// Decisions counter metric name, labelled by status.
pub const METRIC_DECISIONS: &str = "bet_decisions_total";
/// Flagged games counter metric name, labelled by reason.
pub const METRIC_FLAGGED: &str = "games_flagged_total";
/// Circuit breaker transitions counter metric name.
pub const METRIC_RISK_TRANSITIONS: &str = "risk_mode_transitions_total";
/// Probability source retries counter metric name.
pub const METRIC_PROBABILITY_RETRIES: &str = "probability_retries_total";
/// Final bankroll gauge metric name, labelled by run.
pub const METRIC_FINAL_BANKROLL: &str = "final_bankroll";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_RUN_LATENCY,
        "Walk-forward run latency in milliseconds"
    );
    describe_histogram!(
        METRIC_PROBABILITY_LATENCY,
        "Probability source call latency in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_GAMES_PROCESSED, "Total number of games replayed");
    describe_counter!(METRIC_DECISIONS, "Total number of bet decisions by status");
    describe_counter!(METRIC_FLAGGED, "Total number of games flagged by reason");
    describe_counter!(
        METRIC_RISK_TRANSITIONS,
        "Total number of circuit breaker mode transitions"
    );
    describe_counter!(
        METRIC_PROBABILITY_RETRIES,
        "Total number of probability source retries"
    );

    describe_gauge!(METRIC_FINAL_BANKROLL, "Bankroll at the end of a run");

    debug!("Metrics initialized");
}

/// Increment games processed counter.
pub fn inc_games_processed() {
    counter!(METRIC_GAMES_PROCESSED).increment(1);
}

/// Increment decisions counter for `status`.
pub fn inc_decisions(status: &DecisionStatus) {
    let label = match status {
        DecisionStatus::Flagged(_) => "flagged".to_string(),
        other => other.to_string(),
    };
    counter!(METRIC_DECISIONS, "status" => label).increment(1);
}

/// Increment flagged counter for `reason`.
pub fn inc_flagged(reason: FlagReason) {
    counter!(METRIC_FLAGGED, "reason" => reason.to_string()).increment(1);
}

/// Increment circuit breaker transitions counter.
pub fn inc_risk_transitions(from: RiskMode, to: RiskMode) {
    counter!(METRIC_RISK_TRANSITIONS, "from" => from.to_string(), "to" => to.to_string()).increment(1);
}

/// Increment probability retries counter.
pub fn inc_probability_retries() {
    counter!(METRIC_PROBABILITY_RETRIES).increment(1);
}

/// Record the bankroll a run finished with.
pub fn set_final_bankroll(label: &str, bankroll: Decimal) {
    gauge!(METRIC_FINAL_BANKROLL, "run" => label.to_string()).set(bankroll.to_f64().unwrap_or_default());
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for a whole run.
pub fn timer_run() -> LatencyTimer {
    LatencyTimer::new(METRIC_RUN_LATENCY)
}

/// Create a latency timer for one probability source call.
pub fn timer_probability() -> LatencyTimer {
    LatencyTimer::new(METRIC_PROBABILITY_LATENCY)
}
