//! Parallel parameter sweeps.
//!
//! Each variant is an independent run with its own bankroll, circuit breaker
//! and ledger. Variants share only the read-only game list and probability
//! source, so results do not depend on scheduling.

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::engine::WalkForwardEngine;
use super::types::BacktestRun;
use crate::config::Config;
use crate::error::{BacktestError, Result};
use crate::history::Game;
use crate::probability::ProbabilitySource;
use crate::report::{PerformanceReporter, Verdict};

/// One configuration to replay.
#[derive(Debug, Clone)]
pub struct SweepVariant {
    /// Human-readable name, used to label reports.
    pub label: String,
    /// Full configuration for this run.
    pub config: Config,
}

impl SweepVariant {
    /// Create a labelled variant.
    pub fn new(label: impl Into<String>, config: Config) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }
}

/// Result of one variant.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Variant label.
    pub label: String,
    /// Configuration replayed.
    pub config: Config,
    /// Ledger and final state.
    pub run: BacktestRun,
    /// GO / NO-GO against the variant's own thresholds.
    pub verdict: Verdict,
}

/// Variants of `base` differing only in Kelly multiplier.
pub fn kelly_grid(base: &Config, fractions: &[Decimal]) -> Vec<SweepVariant> {
    fractions
        .iter()
        .map(|k| {
            SweepVariant::new(
                format!("kelly={}", k.normalize()),
                Config {
                    kelly_fraction: *k,
                    ..base.clone()
                },
            )
        })
        .collect()
}

/// Replay every variant on the blocking pool and return outcomes in variant
/// order.
///
/// All configurations are validated before any run starts.
#[instrument(skip_all, fields(variants = variants.len(), games = games.len()))]
pub async fn run_sweep<S>(
    variants: Vec<SweepVariant>,
    games: Arc<Vec<Game>>,
    source: Arc<S>,
) -> Result<Vec<SweepOutcome>>
where
    S: ProbabilitySource + Send + Sync + 'static,
{
    for variant in &variants {
        variant.config.validate()?;
    }

    let handles = variants.into_iter().map(|variant| {
        let games = Arc::clone(&games);
        let source = Arc::clone(&source);
        let label = variant.label.clone();
        let handle = tokio::task::spawn_blocking(move || run_variant(variant, &games, source.as_ref()));
        async move {
            handle
                .await
                .map_err(|e| BacktestError::SweepRun {
                    label,
                    reason: e.to_string(),
                })
                .and_then(|outcome| outcome)
        }
    });

    let outcomes = join_all(handles)
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    info!(completed = outcomes.len(), "Sweep complete");
    Ok(outcomes)
}

fn run_variant<S: ProbabilitySource + ?Sized>(
    variant: SweepVariant,
    games: &[Game],
    source: &S,
) -> Result<SweepOutcome> {
    let engine = WalkForwardEngine::new(&variant.config, source)?;
    let run = engine.run(games);
    let verdict = PerformanceReporter::new(variant.config.go_thresholds()).evaluate(&run.ledger);

    info!(
        label = %variant.label,
        decision = %verdict.decision,
        final_bankroll = %run.final_state.bankroll,
        "Variant finished"
    );

    Ok(SweepOutcome {
        label: variant.label,
        config: variant.config,
        run,
        verdict,
    })
}
