//! Walk-forward backtest module.
//!
//! This module handles:
//! - Strict chronological replay of historical games
//! - One immutable ledger entry per game
//! - Parallel parameter sweeps over independent runs

pub mod engine;
pub mod sweep;
pub mod types;

pub use engine::WalkForwardEngine;
pub use sweep::{kelly_grid, run_sweep, SweepOutcome, SweepVariant};
pub use types::{BacktestRun, BankrollState, BetDecision, DecisionStatus, FlagReason, LedgerEntry};
