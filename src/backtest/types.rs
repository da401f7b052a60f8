//! Ledger types produced by a backtest run.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::history::{Game, GameOutcome, Side};
use crate::odds::Odds;
use crate::risk::{HaltReason, RiskMode};

/// Why a game was recorded without a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlagReason {
    /// Odds missing, malformed or outside their domain.
    InvalidOdds,
    /// Probability outside (0, 1).
    InvalidProbability,
    /// Probability source failed, timed out or had nothing.
    CalibrationUnavailable,
    /// Features or model used information from kickoff or later.
    Lookahead,
    /// Game identifier already replayed in this run.
    DuplicateGame,
}

/// What happened to the wager on one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionStatus {
    /// Staked as sized.
    Placed,
    /// Staked after circuit breaker damping.
    Reduced,
    /// Vetoed by the circuit breaker.
    Denied,
    /// No edge, or stake below the smallest unit.
    Skipped,
    /// Bad per-game input; recorded with zero stake.
    Flagged(FlagReason),
}

impl DecisionStatus {
    /// Whether money was put at risk.
    pub fn is_staked(&self) -> bool {
        matches!(self, DecisionStatus::Placed | DecisionStatus::Reduced)
    }
}

/// The wager decision for one game. Created once, never mutated after the
/// engine records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetDecision {
    /// Game identifier.
    pub game_id: String,
    /// Scheduled start.
    pub kickoff: NaiveDateTime,
    /// Side backed.
    pub side: Side,
    /// Participant backed.
    pub team: String,
    /// Calibrated probability used, if one was obtained.
    pub probability: Option<Decimal>,
    /// Parsed odds, if valid.
    pub odds: Option<Odds>,
    /// Profit per unit stake on a win, if odds were valid.
    pub payout_multiplier: Option<Decimal>,
    /// Unscaled Kelly fraction, if sizing ran.
    pub full_kelly: Option<Decimal>,
    /// Kelly multiplier in force.
    pub kelly_fraction: Decimal,
    /// Fraction of bankroll actually staked.
    pub stake_fraction: Decimal,
    /// Currency staked.
    pub stake: Decimal,
    /// Outcome of the decision.
    pub status: DecisionStatus,
    /// Human-readable detail for flagged, denied or skipped games.
    pub note: Option<String>,
}

impl BetDecision {
    /// A zero-stake decision for `game`, to be filled in by the engine.
    pub(crate) fn pending(game: &Game, kelly_fraction: Decimal) -> Self {
        Self {
            game_id: game.id.clone(),
            kickoff: game.kickoff,
            side: game.side,
            team: game.team().to_string(),
            probability: None,
            odds: None,
            payout_multiplier: None,
            full_kelly: None,
            kelly_fraction,
            stake_fraction: Decimal::ZERO,
            stake: Decimal::ZERO,
            status: DecisionStatus::Skipped,
            note: None,
        }
    }

    pub(crate) fn flagged(mut self, reason: FlagReason, note: impl Into<String>) -> Self {
        self.status = DecisionStatus::Flagged(reason);
        self.stake = Decimal::ZERO;
        self.stake_fraction = Decimal::ZERO;
        self.note = Some(note.into());
        self
    }

    pub(crate) fn denied(mut self, note: impl Into<String>) -> Self {
        self.status = DecisionStatus::Denied;
        self.stake = Decimal::ZERO;
        self.stake_fraction = Decimal::ZERO;
        self.note = Some(note.into());
        self
    }

    pub(crate) fn skipped(mut self, note: impl Into<String>) -> Self {
        self.status = DecisionStatus::Skipped;
        self.stake = Decimal::ZERO;
        self.stake_fraction = Decimal::ZERO;
        self.note = Some(note.into());
        self
    }

    pub(crate) fn staked(mut self, status: DecisionStatus, fraction: Decimal, stake: Decimal) -> Self {
        self.status = status;
        self.stake_fraction = fraction;
        self.stake = stake;
        self
    }
}

/// One row of the append-only ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in replay order, starting at 1.
    pub sequence: u64,
    /// The decision taken.
    pub decision: BetDecision,
    /// Realized result for the backed side.
    pub outcome: GameOutcome,
    /// Realized profit or loss.
    pub profit: Decimal,
    /// Bankroll the decision was sized against.
    pub bankroll_before: Decimal,
    /// Bankroll after settlement.
    pub bankroll_after: Decimal,
    /// Running peak after settlement.
    pub peak: Decimal,
    /// Decline from peak after settlement.
    pub drawdown: Decimal,
    /// Circuit breaker mode when the decision was taken.
    pub mode_before: RiskMode,
    /// Circuit breaker mode after settlement.
    pub mode_after: RiskMode,
}

impl LedgerEntry {
    /// Return on stake for a staked entry.
    pub fn bet_return(&self) -> Option<Decimal> {
        if self.decision.stake > Decimal::ZERO {
            Some(self.profit / self.decision.stake)
        } else {
            None
        }
    }
}

/// Bankroll and streak state between games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankrollState {
    /// Current bankroll.
    pub bankroll: Decimal,
    /// Highest bankroll seen in this run.
    pub peak: Decimal,
    /// Staked losses in a row; pushes leave it unchanged.
    pub consecutive_losses: u32,
    /// Circuit breaker mode.
    pub mode: RiskMode,
}

impl BankrollState {
    /// State at the start of a run.
    pub fn initial(bankroll: Decimal) -> Self {
        Self {
            bankroll,
            peak: bankroll,
            consecutive_losses: 0,
            mode: RiskMode::Normal,
        }
    }

    /// Settle one game from this state alone.
    ///
    /// Returns the realized profit and the next state, or `None` when the
    /// payout does not fit in a `Decimal`. The mode is carried over
    /// unchanged; the engine sets it after consulting the circuit breaker.
    pub fn settle(
        &self,
        stake: Decimal,
        outcome: GameOutcome,
        payout_multiplier: Decimal,
    ) -> Option<(Decimal, Self)> {
        if stake <= Decimal::ZERO {
            return Some((Decimal::ZERO, *self));
        }

        let (profit, consecutive_losses) = match outcome {
            GameOutcome::Win => (stake.checked_mul(payout_multiplier)?, 0),
            GameOutcome::Loss => (-stake, self.consecutive_losses.saturating_add(1)),
            GameOutcome::Push => (Decimal::ZERO, self.consecutive_losses),
        };
        let bankroll = self.bankroll.checked_add(profit)?;

        Some((
            profit,
            Self {
                bankroll,
                peak: self.peak.max(bankroll),
                consecutive_losses,
                mode: self.mode,
            },
        ))
    }

    /// Decline from peak.
    pub fn drawdown(&self) -> Decimal {
        crate::risk::drawdown(self.peak, self.bankroll)
    }
}

/// Output of one backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRun {
    /// Bankroll at the start.
    pub initial_bankroll: Decimal,
    /// One entry per game, in replay order.
    pub ledger: Vec<LedgerEntry>,
    /// State after the last game.
    pub final_state: BankrollState,
    /// Why wagering stopped, if it did.
    pub halt_reason: Option<HaltReason>,
}
