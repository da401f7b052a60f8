//! Unified error types for the backtester.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the backtester.
///
/// Only configuration and input-loading failures surface here. Per-game data
/// problems are recorded as flagged ledger entries and never abort a run.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Historical game source error.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// A parallel run panicked or was cancelled.
    #[error("sweep run {label} failed: {reason}")]
    SweepRun {
        /// Label of the failed run.
        label: String,
        /// Reason for failure.
        reason: String,
    },

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Always fatal, raised before any game is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment could not be deserialized.
    #[error("failed to load environment: {0}")]
    Env(#[from] envy::Error),

    /// A numeric option is outside its allowed range.
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        /// Option name.
        field: &'static str,
        /// Supplied value.
        value: Decimal,
        /// Human readable allowed range.
        expected: &'static str,
    },

    /// A counter option must be at least one.
    #[error("{field} must be at least 1")]
    ZeroCount {
        /// Option name.
        field: &'static str,
    },

    /// Warning threshold must sit strictly below the halt threshold.
    #[error("drawdown_warning_pct ({warning}) must be below drawdown_halt_pct ({halt})")]
    ThresholdOrder {
        /// Warning threshold.
        warning: Decimal,
        /// Halt threshold.
        halt: Decimal,
    },

    /// Floor at or above the starting bankroll would halt before the first bet.
    #[error("bankroll_floor ({floor}) must be below initial_bankroll ({bankroll})")]
    FloorAboveBankroll {
        /// Configured floor.
        floor: Decimal,
        /// Configured starting bankroll.
        bankroll: Decimal,
    },
}

/// Odds parsing and conversion errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OddsError {
    /// Odds value is outside the valid domain of its format.
    #[error("invalid odds {value}: {reason}")]
    InvalidOdds {
        /// The offending value as written.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl OddsError {
    pub(crate) fn invalid(value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidOdds {
            value: value.to_string(),
            reason,
        }
    }
}

/// Stake sizing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizingError {
    /// Probability outside the open interval (0, 1).
    #[error("invalid probability {0}: must be in (0, 1)")]
    InvalidProbability(Decimal),

    /// Payout multiplier must be strictly positive.
    #[error("invalid payout multiplier {0}: must be > 0")]
    InvalidOdds(Decimal),

    /// Bankroll must be strictly positive.
    #[error("invalid bankroll {0}: must be > 0")]
    InvalidBankroll(Decimal),

    /// Stake exceeds the representable range.
    #[error("stake overflow: fraction {fraction} of bankroll {bankroll}")]
    StakeOverflow {
        /// Requested fraction.
        fraction: Decimal,
        /// Bankroll at decision time.
        bankroll: Decimal,
    },
}

/// Probability source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// The source has nothing for this game.
    #[error("no prediction available for game {game_id}")]
    Missing {
        /// Game identifier.
        game_id: String,
    },

    /// The source failed.
    #[error("probability source unavailable: {0}")]
    Unavailable(String),

    /// The source did not answer in time.
    #[error("probability source timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time before giving up.
        elapsed_ms: u64,
    },
}

/// Historical game source errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// File contents are not a valid game history.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BacktestError>;
