//! Walk-forward replay of historical games.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::types::{BacktestRun, BankrollState, BetDecision, DecisionStatus, FlagReason, LedgerEntry};
use crate::config::Config;
use crate::error::{CalibrationError, ConfigError, SizingError};
use crate::history::Game;
use crate::metrics;
use crate::odds::convert_str;
use crate::probability::{Prediction, ProbabilitySource};
use crate::risk::{Authorization, BetResolved, HaltReason, RiskManager, RiskMode, StakeRequest};
use crate::sizing::KellySizer;

/// Everything one run mutates. Never shared between runs.
struct RunContext {
    bankroll: BankrollState,
    risk: RiskManager,
    ledger: Vec<LedgerEntry>,
    seen: HashSet<String>,
}

impl RunContext {
    fn new(config: &Config) -> Self {
        Self {
            bankroll: BankrollState::initial(config.initial_bankroll),
            risk: RiskManager::new(config.risk_limits()),
            ledger: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

/// Replays games in strict time order, sizing and settling one wager per game.
pub struct WalkForwardEngine<'a, S: ProbabilitySource + ?Sized> {
    config: Config,
    sizer: KellySizer,
    source: &'a S,
}

impl<'a, S: ProbabilitySource + ?Sized> WalkForwardEngine<'a, S> {
    /// Validate `config` and build an engine. Fails before any game is seen.
    pub fn new(config: &Config, source: &'a S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            sizer: config.sizer(),
            source,
        })
    }

    /// Configuration in force.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replay `games` and return the complete ledger.
    ///
    /// Input order does not matter: games are replayed by kickoff, then
    /// season, week and identifier. Every game produces exactly one entry.
    #[instrument(skip(self, games), fields(games = games.len(), kelly = %self.config.kelly_fraction))]
    pub fn run(&self, games: &[Game]) -> BacktestRun {
        let _timer = metrics::timer_run();
        let mut ordered: Vec<&Game> = games.iter().collect();
        ordered.sort_by(|a, b| a.key().cmp(&b.key()));

        info!(
            initial_bankroll = %self.config.initial_bankroll,
            max_stake_fraction = %self.config.max_stake_fraction,
            "Starting walk-forward run"
        );

        let mut ctx = RunContext::new(&self.config);
        for game in ordered {
            self.step(&mut ctx, game);
        }

        let run = BacktestRun {
            initial_bankroll: self.config.initial_bankroll,
            final_state: ctx.bankroll,
            halt_reason: ctx.risk.state().halt_reason,
            ledger: ctx.ledger,
        };

        info!(
            entries = run.ledger.len(),
            final_bankroll = %run.final_state.bankroll,
            peak = %run.final_state.peak,
            mode = %run.final_state.mode,
            "Walk-forward run complete"
        );

        run
    }

    /// Decide, settle and record one game.
    fn step(&self, ctx: &mut RunContext, game: &Game) {
        metrics::inc_games_processed();

        let before = ctx.bankroll;
        let mode_before = ctx.risk.mode();
        let mut decision = self.decide(ctx, game, before.bankroll);

        let payout = decision.payout_multiplier.unwrap_or_default();
        let (profit, mut after) = match before.settle(decision.stake, game.outcome, payout) {
            Some(settled) => settled,
            None => {
                let note = format!("payout of {} at x{} overflows the bankroll", decision.stake, payout);
                decision = flag(decision, game, FlagReason::InvalidOdds, note);
                (Decimal::ZERO, before)
            }
        };

        if decision.status.is_staked() {
            ctx.risk.observe(&BetResolved {
                bankroll: after.bankroll,
                peak: after.peak,
                consecutive_losses: after.consecutive_losses,
            });
            if !self.sizer.can_fund(after.bankroll) {
                ctx.risk.force_halt(HaltReason::Bankruptcy);
            }
        }
        after.mode = ctx.risk.mode();

        metrics::inc_decisions(&decision.status);
        debug!(
            game = %game.id,
            status = %decision.status,
            stake = %decision.stake,
            profit = %profit,
            bankroll = %after.bankroll,
            mode = %after.mode,
            "Game settled"
        );

        let entry = LedgerEntry {
            sequence: ctx.ledger.len() as u64 + 1,
            outcome: game.outcome,
            profit,
            bankroll_before: before.bankroll,
            bankroll_after: after.bankroll,
            peak: after.peak,
            drawdown: after.drawdown(),
            mode_before,
            mode_after: after.mode,
            decision,
        };
        ctx.ledger.push(entry);
        ctx.bankroll = after;
    }

    /// Steps 1 to 4: probability, odds, sizing and authorization.
    fn decide(&self, ctx: &mut RunContext, game: &Game, bankroll: Decimal) -> BetDecision {
        let decision = BetDecision::pending(game, self.sizer.kelly_fraction());

        if !ctx.seen.insert(game.id.clone()) {
            return flag(decision, game, FlagReason::DuplicateGame, "game already replayed in this run");
        }

        if ctx.risk.mode() == RiskMode::Halted {
            let reason = ctx
                .risk
                .state()
                .halt_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "halted".to_string());
            return decision.denied(format!("circuit breaker halted: {}", reason));
        }

        if game.features.leaks_past(game.kickoff) {
            return flag(
                decision,
                game,
                FlagReason::Lookahead,
                format!("features computed at {:?}, kickoff {}", game.features.as_of, game.kickoff),
            );
        }

        let prediction = match self.predict(game) {
            Ok(p) => p,
            Err(e) => return flag(decision, game, FlagReason::CalibrationUnavailable, e.to_string()),
        };

        if prediction.game_id != game.id {
            return flag(
                decision,
                game,
                FlagReason::CalibrationUnavailable,
                format!("source answered for {}", prediction.game_id),
            );
        }

        if prediction.leaks_past(game.kickoff) {
            return flag(
                decision,
                game,
                FlagReason::Lookahead,
                format!("model trained through {:?}, kickoff {}", prediction.trained_through, game.kickoff),
            );
        }

        let mut decision = BetDecision {
            probability: Some(prediction.probability),
            ..decision
        };

        if !prediction.is_valid_probability() {
            let note = format!("probability {} outside (0, 1)", prediction.probability);
            return flag(decision, game, FlagReason::InvalidProbability, note);
        }

        let (odds, implied) = match convert_str(&game.odds) {
            Ok(converted) => converted,
            Err(e) => return flag(decision, game, FlagReason::InvalidOdds, e.to_string()),
        };
        decision.odds = Some(odds);
        decision.payout_multiplier = Some(implied.payout_multiplier);

        let recommendation =
            match self
                .sizer
                .recommend(prediction.probability, implied.payout_multiplier, bankroll)
            {
                Ok(r) => r,
                Err(e) => return sizing_rejected(decision, game, e),
            };
        decision.full_kelly = Some(recommendation.full_kelly);

        if recommendation.fraction <= Decimal::ZERO {
            let note = format!(
                "no edge: p={} edge {}",
                prediction.probability,
                implied.edge(prediction.probability).round_dp(4)
            );
            return decision.skipped(note);
        }

        let request = StakeRequest {
            fraction: recommendation.fraction,
            bankroll,
        };
        let (status, recommendation) = match ctx.risk.authorize(&request) {
            Authorization::Allow => (DecisionStatus::Placed, recommendation),
            Authorization::AllowReduced { fraction } => {
                match self.sizer.resize(&recommendation, fraction, bankroll) {
                    Ok(r) => (DecisionStatus::Reduced, r),
                    Err(e) => return sizing_rejected(decision, game, e),
                }
            }
            Authorization::Deny => return decision.denied("circuit breaker denied"),
        };

        if !recommendation.is_bet() {
            let note = format!("stake for fraction {} below smallest unit", recommendation.fraction);
            return decision.skipped(note);
        }

        decision.staked(status, recommendation.fraction, recommendation.stake)
    }

    /// Ask the probability source, retrying transient failures.
    fn predict(&self, game: &Game) -> Result<Prediction, CalibrationError> {
        let context = game.context();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = {
                let _timer = metrics::timer_probability();
                self.source.predict(&context)
            };
            match result {
                Ok(prediction) => return Ok(prediction),
                Err(e @ CalibrationError::Missing { .. }) => return Err(e),
                Err(e) if attempt > self.config.probability_retries => return Err(e),
                Err(e) => {
                    metrics::inc_probability_retries();
                    debug!(game = %game.id, attempt, error = %e, "Retrying probability source");
                }
            }
        }
    }
}

fn flag(decision: BetDecision, game: &Game, reason: FlagReason, note: impl Into<String>) -> BetDecision {
    let note = note.into();
    metrics::inc_flagged(reason);
    warn!(game = %game.id, reason = %reason, detail = %note, "Game flagged, recording zero stake");
    decision.flagged(reason, note)
}

fn sizing_rejected(decision: BetDecision, game: &Game, err: SizingError) -> BetDecision {
    match err {
        SizingError::InvalidProbability(_) => {
            flag(decision, game, FlagReason::InvalidProbability, err.to_string())
        }
        SizingError::InvalidOdds(_) | SizingError::StakeOverflow { .. } => {
            flag(decision, game, FlagReason::InvalidOdds, err.to_string())
        }
        SizingError::InvalidBankroll(_) => decision.denied(err.to_string()),
    }
}
