//! Walk-forward backtester and bet sizer for game-level moneyline wagers.
//!
//! Games are replayed strictly in kickoff order. For each game a calibrated
//! win probability is combined with the market price to size a fractional
//! Kelly stake, a circuit breaker may damp or veto it, and the result is
//! settled into an append-only ledger. The ledger is then reduced to a
//! GO / NO-GO verdict.
//!
//! # Sizing
//!
//! ```text
//! p = 0.60, decimal odds 2.00  ->  b = 1.00
//! full Kelly   f* = (b*p - q) / b = 0.20
//! quarter      0.25 * f*      = 0.05
//! capped       min(0.05, 0.05) = 0.05   ->  stake 50 of 1000
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Odds parsing and implied probability
//! - [`sizing`]: Fractional Kelly stake sizing
//! - [`risk`]: Circuit breaker state machine
//! - [`history`]: Game records, loading and scripted fixtures
//! - [`probability`]: Probability sources consumed by the engine
//! - [`backtest`]: Walk-forward engine and parameter sweeps
//! - [`report`]: Performance statistics, verdicts and report sinks
//! - [`metrics`]: Prometheus metrics

pub mod backtest;
pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod odds;
pub mod probability;
pub mod report;
pub mod risk;
pub mod sizing;

pub use config::Config;
pub use error::{BacktestError, Result};
