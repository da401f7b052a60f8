//! Backtest configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::report::GoThresholds;
use crate::risk::RiskLimits;
use crate::sizing::KellySizer;

/// Backtest configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    // === Bankroll ===
    /// Starting bankroll in currency units.
    #[serde(default = "default_initial_bankroll")]
    pub initial_bankroll: Decimal,

    /// Smallest stake increment; stakes are rounded down to a multiple of it.
    #[serde(default = "default_stake_unit")]
    pub stake_unit: Decimal,

    // === Sizing ===
    /// Kelly multiplier (0.25 = quarter Kelly).
    #[serde(default = "default_kelly_fraction")]
    pub kelly_fraction: Decimal,

    /// Hard cap on stake as a fraction of bankroll.
    #[serde(default = "default_max_stake_fraction")]
    pub max_stake_fraction: Decimal,

    // === Circuit breaker ===
    /// Drawdown from peak that moves NORMAL into COOLDOWN.
    #[serde(default = "default_drawdown_warning_pct")]
    pub drawdown_warning_pct: Decimal,

    /// Drawdown from peak that halts wagering for the rest of the run.
    #[serde(default = "default_drawdown_halt_pct")]
    pub drawdown_halt_pct: Decimal,

    /// Loss streak length that, once exceeded, moves NORMAL into COOLDOWN.
    #[serde(default = "default_consecutive_loss_warning")]
    pub consecutive_loss_warning: u32,

    /// Clean resolved bets required to leave COOLDOWN.
    #[serde(default = "default_cooldown_recovery_bets")]
    pub cooldown_recovery_bets: u32,

    /// Stake multiplier applied while in COOLDOWN.
    #[serde(default = "default_cooldown_damping")]
    pub cooldown_damping: Decimal,

    /// Bankroll below which wagering halts.
    #[serde(default)]
    pub bankroll_floor: Decimal,

    // === Probability source ===
    /// Extra attempts against the probability source before flagging a game.
    #[serde(default = "default_probability_retries")]
    pub probability_retries: u32,

    // === GO / NO-GO ===
    /// ROI the run must strictly exceed.
    #[serde(default = "default_go_min_roi")]
    pub go_min_roi: Decimal,

    /// Max drawdown the run must stay strictly below.
    #[serde(default = "default_go_max_drawdown")]
    pub go_max_drawdown: Decimal,

    /// Minimum number of staked bets for a meaningful verdict.
    #[serde(default = "default_go_min_bets")]
    pub go_min_bets: u64,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_initial_bankroll() -> Decimal {
    Decimal::new(1000, 0) // $1000
}

fn default_stake_unit() -> Decimal {
    Decimal::new(1, 2) // $0.01
}

fn default_kelly_fraction() -> Decimal {
    Decimal::new(25, 2) // quarter Kelly
}

fn default_max_stake_fraction() -> Decimal {
    Decimal::new(5, 2) // 5% of bankroll
}

fn default_drawdown_warning_pct() -> Decimal {
    Decimal::new(15, 2) // 15%
}

fn default_drawdown_halt_pct() -> Decimal {
    Decimal::new(25, 2) // 25%
}

fn default_consecutive_loss_warning() -> u32 {
    5
}

fn default_cooldown_recovery_bets() -> u32 {
    3
}

fn default_cooldown_damping() -> Decimal {
    Decimal::new(5, 1) // half stakes
}

fn default_probability_retries() -> u32 {
    1
}

fn default_go_min_roi() -> Decimal {
    Decimal::new(3, 2) // 3%
}

fn default_go_max_drawdown() -> Decimal {
    Decimal::new(20, 2) // 20%
}

fn default_go_min_bets() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_bankroll: default_initial_bankroll(),
            stake_unit: default_stake_unit(),
            kelly_fraction: default_kelly_fraction(),
            max_stake_fraction: default_max_stake_fraction(),
            drawdown_warning_pct: default_drawdown_warning_pct(),
            drawdown_halt_pct: default_drawdown_halt_pct(),
            consecutive_loss_warning: default_consecutive_loss_warning(),
            cooldown_recovery_bets: default_cooldown_recovery_bets(),
            cooldown_damping: default_cooldown_damping(),
            bankroll_floor: Decimal::ZERO,
            probability_retries: default_probability_retries(),
            go_min_roi: default_go_min_roi(),
            go_max_drawdown: default_go_max_drawdown(),
            go_min_bets: default_go_min_bets(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check that every option is in range and the thresholds are coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("initial_bankroll", self.initial_bankroll)?;
        positive("stake_unit", self.stake_unit)?;
        unit_interval("kelly_fraction", self.kelly_fraction)?;
        unit_interval("max_stake_fraction", self.max_stake_fraction)?;
        unit_interval("drawdown_warning_pct", self.drawdown_warning_pct)?;
        unit_interval("drawdown_halt_pct", self.drawdown_halt_pct)?;
        unit_interval("cooldown_damping", self.cooldown_damping)?;
        unit_interval("go_max_drawdown", self.go_max_drawdown)?;

        if self.drawdown_warning_pct >= self.drawdown_halt_pct {
            return Err(ConfigError::ThresholdOrder {
                warning: self.drawdown_warning_pct,
                halt: self.drawdown_halt_pct,
            });
        }

        if self.consecutive_loss_warning == 0 {
            return Err(ConfigError::ZeroCount {
                field: "consecutive_loss_warning",
            });
        }

        if self.cooldown_recovery_bets == 0 {
            return Err(ConfigError::ZeroCount {
                field: "cooldown_recovery_bets",
            });
        }

        if self.bankroll_floor.is_sign_negative() {
            return Err(ConfigError::OutOfRange {
                field: "bankroll_floor",
                value: self.bankroll_floor,
                expected: ">= 0",
            });
        }

        if self.bankroll_floor >= self.initial_bankroll {
            return Err(ConfigError::FloorAboveBankroll {
                floor: self.bankroll_floor,
                bankroll: self.initial_bankroll,
            });
        }

        Ok(())
    }

    /// Build the stake sizer described by this configuration.
    pub fn sizer(&self) -> KellySizer {
        KellySizer::new(self.kelly_fraction, self.max_stake_fraction, self.stake_unit)
    }

    /// Circuit breaker limits described by this configuration.
    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            drawdown_warning_pct: self.drawdown_warning_pct,
            drawdown_halt_pct: self.drawdown_halt_pct,
            consecutive_loss_warning: self.consecutive_loss_warning,
            cooldown_recovery_bets: self.cooldown_recovery_bets,
            cooldown_damping: self.cooldown_damping,
            bankroll_floor: self.bankroll_floor,
        }
    }

    /// Verdict thresholds described by this configuration.
    pub fn go_thresholds(&self) -> GoThresholds {
        GoThresholds {
            min_roi: self.go_min_roi,
            max_drawdown: self.go_max_drawdown,
            min_bets: self.go_min_bets,
        }
    }
}

fn positive(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "> 0",
        })
    }
}

fn unit_interval(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value > Decimal::ZERO && value <= Decimal::ONE {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "(0, 1]",
        })
    }
}
