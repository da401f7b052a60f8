//! Ledger statistics.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use crate::backtest::{DecisionStatus, LedgerEntry};
use crate::history::GameOutcome;
use crate::risk::{drawdown, RiskMode};

/// Entries per decision status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Staked as sized.
    pub placed: u64,
    /// Staked after damping.
    pub reduced: u64,
    /// Vetoed by the circuit breaker.
    pub denied: u64,
    /// No edge or stake below unit.
    pub skipped: u64,
    /// Bad per-game input.
    pub flagged: u64,
    /// Flagged entries keyed by reason.
    pub flagged_by_reason: BTreeMap<String, u64>,
}

impl StatusCounts {
    fn record(&mut self, status: &DecisionStatus) {
        match status {
            DecisionStatus::Placed => self.placed += 1,
            DecisionStatus::Reduced => self.reduced += 1,
            DecisionStatus::Denied => self.denied += 1,
            DecisionStatus::Skipped => self.skipped += 1,
            DecisionStatus::Flagged(reason) => {
                self.flagged += 1;
                *self.flagged_by_reason.entry(reason.to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Aggregate performance of one ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Ledger entries.
    pub games: u64,
    /// Entries with money at risk.
    pub bets: u64,
    /// Staked bets won.
    pub wins: u64,
    /// Staked bets lost.
    pub losses: u64,
    /// Staked bets pushed.
    pub pushes: u64,
    /// Wins over decided bets; pushes excluded.
    pub win_rate: Option<Decimal>,
    /// Sum of stakes.
    pub total_staked: Decimal,
    /// Sum of realized profit.
    pub total_profit: Decimal,
    /// Total profit over total staked.
    pub roi: Option<Decimal>,
    /// Bankroll before the first game.
    pub initial_bankroll: Decimal,
    /// Bankroll after the last game.
    pub final_bankroll: Decimal,
    /// Highest bankroll reached.
    pub peak_bankroll: Decimal,
    /// Largest peak-to-trough decline as a fraction of the peak.
    pub max_drawdown: Decimal,
    /// Mean per-bet return over its sample standard deviation. Null when
    /// fewer than two bets or zero variance.
    pub sharpe: Option<Decimal>,
    /// Entries per decision status.
    pub status_counts: StatusCounts,
    /// Circuit breaker mode after the last game.
    pub final_mode: Option<RiskMode>,
}

/// Compute statistics over a ledger in replay order.
pub fn summarize(ledger: &[LedgerEntry]) -> PerformanceSummary {
    let mut summary = PerformanceSummary::default();

    let Some(first) = ledger.first() else {
        return summary;
    };
    summary.initial_bankroll = first.bankroll_before;
    summary.peak_bankroll = first.bankroll_before;
    summary.final_bankroll = first.bankroll_before;

    let mut returns = Vec::new();
    for entry in ledger {
        summary.games += 1;
        summary.status_counts.record(&entry.decision.status);
        summary.total_profit += entry.profit;

        if entry.decision.stake > Decimal::ZERO {
            summary.bets += 1;
            summary.total_staked += entry.decision.stake;
            match entry.outcome {
                GameOutcome::Win => summary.wins += 1,
                GameOutcome::Loss => summary.losses += 1,
                GameOutcome::Push => summary.pushes += 1,
            }
        }
        if let Some(r) = entry.bet_return() {
            returns.push(r);
        }

        summary.final_bankroll = entry.bankroll_after;
        summary.peak_bankroll = summary.peak_bankroll.max(entry.bankroll_after);
        summary.max_drawdown = summary
            .max_drawdown
            .max(drawdown(summary.peak_bankroll, entry.bankroll_after));
        summary.final_mode = Some(entry.mode_after);
    }

    let decided = summary.wins + summary.losses;
    if decided > 0 {
        summary.win_rate = Some(Decimal::from(summary.wins) / Decimal::from(decided));
    }
    if summary.total_staked > Decimal::ZERO {
        summary.roi = Some(summary.total_profit / summary.total_staked);
    }
    summary.sharpe = sharpe_ratio(&returns);

    summary
}

/// Mean over sample standard deviation; `None` below two samples or with
/// zero variance.
pub fn sharpe_ratio(returns: &[Decimal]) -> Option<Decimal> {
    if returns.len() < 2 {
        return None;
    }
    let n = Decimal::from(returns.len() as u64);
    let mean = returns.iter().copied().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| (*r - mean) * (*r - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    if variance.is_zero() {
        return None;
    }
    let std_dev = variance.sqrt()?;
    if std_dev.is_zero() {
        return None;
    }
    Some((mean / std_dev).round_dp(8))
}
