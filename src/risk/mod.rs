//! Risk management module.
//!
//! This module handles:
//! - The NORMAL / COOLDOWN / HALTED circuit breaker state machine
//! - Authorization of individual wagers against the current mode

pub mod manager;
pub mod state;

pub use manager::{Authorization, ModeChange, RiskManager, StakeRequest};
pub use state::{drawdown, transition, BetResolved, HaltReason, RiskLimits, RiskMode, RiskState};
