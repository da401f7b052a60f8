//! GO / NO-GO decision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::info;

use super::summary::{summarize, PerformanceSummary};
use crate::backtest::LedgerEntry;

/// Thresholds a run must meet to go to production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoThresholds {
    /// ROI must be strictly above this.
    pub min_roi: Decimal,
    /// Max drawdown must be strictly below this.
    pub max_drawdown: Decimal,
    /// At least this many staked bets.
    pub min_bets: u64,
}

impl Default for GoThresholds {
    fn default() -> Self {
        Self {
            min_roi: Decimal::new(3, 2),
            max_drawdown: Decimal::new(20, 2),
            min_bets: 1,
        }
    }
}

/// Binary production decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum GoDecision {
    /// Thresholds met.
    #[serde(rename = "GO")]
    #[strum(serialize = "GO")]
    Go,
    /// At least one threshold missed.
    #[serde(rename = "NO-GO")]
    #[strum(serialize = "NO-GO")]
    NoGo,
}

/// One metric compared against its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    /// Metric name.
    pub metric: String,
    /// Observed value; `None` when undefined.
    pub value: Option<Decimal>,
    /// Threshold applied.
    pub threshold: Decimal,
    /// Whether the check passed.
    pub passed: bool,
}

/// Terminal artifact of a backtest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// GO or NO-GO.
    pub decision: GoDecision,
    /// Metrics the decision was based on.
    pub summary: PerformanceSummary,
    /// Thresholds applied.
    pub thresholds: GoThresholds,
    /// Per-metric outcomes.
    pub checks: Vec<ThresholdCheck>,
}

impl Verdict {
    /// Whether the run may go to production.
    pub fn is_go(&self) -> bool {
        self.decision == GoDecision::Go
    }

    /// Names of checks that failed.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.metric.as_str())
            .collect()
    }
}

/// Aggregates a ledger and applies thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceReporter {
    thresholds: GoThresholds,
}

impl PerformanceReporter {
    /// Create a reporter with the given thresholds.
    pub fn new(thresholds: GoThresholds) -> Self {
        Self { thresholds }
    }

    /// Statistics only.
    pub fn summarize(&self, ledger: &[LedgerEntry]) -> PerformanceSummary {
        summarize(ledger)
    }

    /// Statistics plus the GO / NO-GO decision.
    pub fn evaluate(&self, ledger: &[LedgerEntry]) -> Verdict {
        let summary = summarize(ledger);
        let t = self.thresholds;

        let checks = vec![
            ThresholdCheck {
                metric: "roi".to_string(),
                value: summary.roi,
                threshold: t.min_roi,
                passed: summary.roi.is_some_and(|roi| roi > t.min_roi),
            },
            ThresholdCheck {
                metric: "max_drawdown".to_string(),
                value: Some(summary.max_drawdown),
                threshold: t.max_drawdown,
                passed: summary.max_drawdown < t.max_drawdown,
            },
            ThresholdCheck {
                metric: "bets".to_string(),
                value: Some(Decimal::from(summary.bets)),
                threshold: Decimal::from(t.min_bets),
                passed: summary.bets >= t.min_bets,
            },
        ];

        let decision = if checks.iter().all(|c| c.passed) {
            GoDecision::Go
        } else {
            GoDecision::NoGo
        };

        info!(
            decision = %decision,
            roi = ?summary.roi,
            max_drawdown = %summary.max_drawdown,
            sharpe = ?summary.sharpe,
            bets = summary.bets,
            "Verdict computed"
        );

        Verdict {
            decision,
            summary,
            thresholds: t,
            checks,
        }
    }
}
