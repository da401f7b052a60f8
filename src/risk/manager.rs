//! Circuit breaker that gates individual wagers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::state::{transition, BetResolved, HaltReason, RiskLimits, RiskMode, RiskState};
use crate::metrics;

/// A wager submitted for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeRequest {
    /// Fraction of bankroll recommended by the sizer.
    pub fraction: Decimal,
    /// Bankroll at decision time.
    pub bankroll: Decimal,
}

/// Circuit breaker answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Authorization {
    /// Place as recommended.
    Allow,
    /// Place with a smaller fraction.
    AllowReduced {
        /// Damped fraction of bankroll.
        fraction: Decimal,
    },
    /// Do not place.
    Deny,
}

/// Mode change produced by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    /// Mode before.
    pub from: RiskMode,
    /// Mode after.
    pub to: RiskMode,
}

/// Circuit breaker owned by exactly one backtest run.
#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
    state: RiskState,
}

impl RiskManager {
    /// Create a manager in NORMAL mode.
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            state: RiskState::default(),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> RiskMode {
        self.state.mode
    }

    /// Full state, including recovery progress.
    pub fn state(&self) -> RiskState {
        self.state
    }

    /// Decide whether a wager may be placed.
    pub fn authorize(&self, request: &StakeRequest) -> Authorization {
        if request.bankroll <= Decimal::ZERO {
            return Authorization::Deny;
        }
        match self.state.mode {
            RiskMode::Normal => Authorization::Allow,
            RiskMode::Cooldown => Authorization::AllowReduced {
                fraction: request.fraction * self.limits.cooldown_damping,
            },
            RiskMode::Halted => Authorization::Deny,
        }
    }

    /// Feed one resolved bet through the state machine.
    pub fn observe(&mut self, event: &BetResolved) -> Option<ModeChange> {
        let next = transition(self.state, event, &self.limits);
        let change = (next.mode != self.state.mode).then_some(ModeChange {
            from: self.state.mode,
            to: next.mode,
        });
        self.state = next;

        if let Some(change) = change {
            metrics::inc_risk_transitions(change.from, change.to);
            if change.to == RiskMode::Halted {
                warn!(
                    from = %change.from,
                    reason = ?self.state.halt_reason,
                    bankroll = %event.bankroll,
                    peak = %event.peak,
                    drawdown = %event.drawdown(),
                    "Circuit breaker halted wagering"
                );
            } else {
                info!(
                    from = %change.from,
                    to = %change.to,
                    bankroll = %event.bankroll,
                    drawdown = %event.drawdown(),
                    consecutive_losses = event.consecutive_losses,
                    "Circuit breaker mode change"
                );
            }
        }

        change
    }

    /// Halt immediately, bypassing thresholds.
    pub fn force_halt(&mut self, reason: HaltReason) -> Option<ModeChange> {
        if self.state.is_halted() {
            return None;
        }
        let from = self.state.mode;
        self.state = RiskState::halted(reason);
        metrics::inc_risk_transitions(from, RiskMode::Halted);
        warn!(from = %from, reason = %reason, "Circuit breaker forced halt");
        Some(ModeChange {
            from,
            to: RiskMode::Halted,
        })
    }
}
