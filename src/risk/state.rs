//! Circuit breaker state machine.
//!
//! Transitions are pure: `(state, event, limits) -> state`. The manager in
//! [`super::manager`] owns one [`RiskState`] per run and applies them in
//! time order.
//!
//! ```text
//!            breach warning             clean streak reached
//!   NORMAL ─────────────────▶ COOLDOWN ─────────────────────▶ NORMAL
//!     │                          │
//!     │ breach halt / floor      │ breach halt / floor
//!     ▼                          ▼
//!   HALTED ◀─────────────────────┘   (terminal)
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Circuit breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskMode {
    /// Bets pass through unchanged.
    #[default]
    Normal,
    /// Bets are damped.
    Cooldown,
    /// Every bet is denied for the rest of the run.
    Halted,
}

/// Why wagering was halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HaltReason {
    /// Drawdown from peak exceeded the halt threshold.
    Drawdown,
    /// Bankroll fell below the configured floor.
    BankrollFloor,
    /// Bankroll can no longer fund the smallest stake.
    Bankruptcy,
}

/// Thresholds driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Drawdown above which NORMAL moves to COOLDOWN.
    pub drawdown_warning_pct: Decimal,
    /// Drawdown above which wagering halts.
    pub drawdown_halt_pct: Decimal,
    /// Loss streak above which NORMAL moves to COOLDOWN.
    pub consecutive_loss_warning: u32,
    /// Clean resolved bets needed to leave COOLDOWN.
    pub cooldown_recovery_bets: u32,
    /// Stake multiplier while in COOLDOWN.
    pub cooldown_damping: Decimal,
    /// Bankroll below which wagering halts.
    pub bankroll_floor: Decimal,
}

/// Bankroll observation after one staked bet has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetResolved {
    /// Bankroll after settlement.
    pub bankroll: Decimal,
    /// Running peak including this settlement.
    pub peak: Decimal,
    /// Loss streak including this settlement.
    pub consecutive_losses: u32,
}

impl BetResolved {
    /// Fractional decline from the running peak.
    pub fn drawdown(&self) -> Decimal {
        drawdown(self.peak, self.bankroll)
    }
}

/// Fractional decline of `bankroll` from `peak`, zero when `peak` is not positive.
pub fn drawdown(peak: Decimal, bankroll: Decimal) -> Decimal {
    if peak <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((peak - bankroll) / peak).max(Decimal::ZERO)
}

/// Circuit breaker state carried across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskState {
    /// Current mode.
    pub mode: RiskMode,
    /// Clean resolved bets since entering COOLDOWN.
    pub recovery_progress: u32,
    /// Set once the run halts.
    pub halt_reason: Option<HaltReason>,
}

impl RiskState {
    /// Whether the run has halted.
    pub fn is_halted(&self) -> bool {
        self.mode == RiskMode::Halted
    }

    /// Halted state with the given reason.
    pub fn halted(reason: HaltReason) -> Self {
        Self {
            mode: RiskMode::Halted,
            recovery_progress: 0,
            halt_reason: Some(reason),
        }
    }
}

/// Apply one resolved bet to the state machine.
pub fn transition(state: RiskState, event: &BetResolved, limits: &RiskLimits) -> RiskState {
    if state.is_halted() {
        return state;
    }

    if let Some(reason) = halt_reason(event, limits) {
        return RiskState::halted(reason);
    }

    let breach = warning_breached(event, limits);

    match state.mode {
        RiskMode::Normal if breach => RiskState {
            mode: RiskMode::Cooldown,
            recovery_progress: 0,
            halt_reason: None,
        },
        RiskMode::Normal => state,
        RiskMode::Cooldown if breach => RiskState {
            recovery_progress: 0,
            ..state
        },
        RiskMode::Cooldown => {
            let progress = state.recovery_progress + 1;
            if progress >= limits.cooldown_recovery_bets {
                RiskState::default()
            } else {
                RiskState {
                    recovery_progress: progress,
                    ..state
                }
            }
        }
        RiskMode::Halted => state,
    }
}

fn halt_reason(event: &BetResolved, limits: &RiskLimits) -> Option<HaltReason> {
    if event.bankroll <= Decimal::ZERO {
        Some(HaltReason::Bankruptcy)
    } else if event.bankroll < limits.bankroll_floor {
        Some(HaltReason::BankrollFloor)
    } else if event.drawdown() > limits.drawdown_halt_pct {
        Some(HaltReason::Drawdown)
    } else {
        None
    }
}

fn warning_breached(event: &BetResolved, limits: &RiskLimits) -> bool {
    event.drawdown() > limits.drawdown_warning_pct
        || event.consecutive_losses > limits.consecutive_loss_warning
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> RiskLimits {
        RiskLimits {
            drawdown_warning_pct: dec!(0.15),
            drawdown_halt_pct: dec!(0.25),
            consecutive_loss_warning: 3,
            cooldown_recovery_bets: 2,
            cooldown_damping: dec!(0.5),
            bankroll_floor: dec!(100),
        }
    }

    fn event(bankroll: Decimal, peak: Decimal, losses: u32) -> BetResolved {
        BetResolved {
            bankroll,
            peak,
            consecutive_losses: losses,
        }
    }

    #[test]
    fn normal_stays_normal_inside_limits() {
        let next = transition(RiskState::default(), &event(dec!(900), dec!(1000), 2), &limits());
        assert_eq!(next.mode, RiskMode::Normal);
    }

    #[test]
    fn drawdown_warning_enters_cooldown() {
        let next = transition(RiskState::default(), &event(dec!(840), dec!(1000), 0), &limits());
        assert_eq!(next.mode, RiskMode::Cooldown);
        assert_eq!(next.recovery_progress, 0);
    }

    #[test]
    fn exactly_at_warning_is_not_a_breach() {
        let next = transition(RiskState::default(), &event(dec!(850), dec!(1000), 0), &limits());
        assert_eq!(next.mode, RiskMode::Normal);
    }

    #[test]
    fn loss_streak_enters_cooldown() {
        let next = transition(RiskState::default(), &event(dec!(990), dec!(1000), 4), &limits());
        assert_eq!(next.mode, RiskMode::Cooldown);
    }

    #[test]
    fn cooldown_recovers_after_clean_streak() {
        let cooling = RiskState {
            mode: RiskMode::Cooldown,
            recovery_progress: 0,
            halt_reason: None,
        };
        let clean = event(dec!(900), dec!(1000), 0);

        let one = transition(cooling, &clean, &limits());
        assert_eq!(one.mode, RiskMode::Cooldown);
        assert_eq!(one.recovery_progress, 1);

        let two = transition(one, &clean, &limits());
        assert_eq!(two, RiskState::default());
    }

    #[test]
    fn breach_during_cooldown_resets_progress() {
        let cooling = RiskState {
            mode: RiskMode::Cooldown,
            recovery_progress: 1,
            halt_reason: None,
        };
        let next = transition(cooling, &event(dec!(800), dec!(1000), 0), &limits());
        assert_eq!(next.mode, RiskMode::Cooldown);
        assert_eq!(next.recovery_progress, 0);
    }

    #[test]
    fn halt_on_drawdown_from_any_live_mode() {
        let deep = event(dec!(740), dec!(1000), 0);
        for mode in [RiskMode::Normal, RiskMode::Cooldown] {
            let state = RiskState {
                mode,
                ..RiskState::default()
            };
            let next = transition(state, &deep, &limits());
            assert_eq!(next, RiskState::halted(HaltReason::Drawdown));
        }
    }

    #[test]
    fn halt_on_floor_and_bankruptcy() {
        let floor = transition(RiskState::default(), &event(dec!(99), dec!(110), 0), &limits());
        assert_eq!(floor.halt_reason, Some(HaltReason::BankrollFloor));

        let broke = transition(RiskState::default(), &event(dec!(0), dec!(1000), 0), &limits());
        assert_eq!(broke.halt_reason, Some(HaltReason::Bankruptcy));
    }

    #[test]
    fn halted_is_terminal() {
        let halted = RiskState::halted(HaltReason::Drawdown);
        let next = transition(halted, &event(dec!(2000), dec!(2000), 0), &limits());
        assert_eq!(next, halted);
    }

    #[test]
    fn drawdown_is_zero_at_peak_and_without_peak() {
        assert_eq!(drawdown(dec!(1000), dec!(1000)), Decimal::ZERO);
        assert_eq!(drawdown(Decimal::ZERO, dec!(10)), Decimal::ZERO);
        assert_eq!(drawdown(dec!(1000), dec!(750)), dec!(0.25));
    }
}
