//! End-to-end tests of the walk-forward backtester.
//!
//! Everything here goes through the public API only. Histories are scripted
//! with `SyntheticHistory`; no network or environment is required.

use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use gridiron_edge::backtest::{DecisionStatus, FlagReason, LedgerEntry, WalkForwardEngine};
use gridiron_edge::config::Config;
use gridiron_edge::error::CalibrationError;
use gridiron_edge::history::{parse_history, Game, GameContext, GameOutcome, SyntheticHistory};
use gridiron_edge::probability::{PrecomputedPredictions, Prediction, ProbabilitySource};
use gridiron_edge::report::{GoDecision, JsonFileSink, PerformanceReporter, ReportSink};
use gridiron_edge::risk::{HaltReason, RiskMode};

fn config() -> Config {
    Config {
        initial_bankroll: dec!(1000),
        kelly_fraction: dec!(0.25),
        max_stake_fraction: dec!(0.05),
        drawdown_halt_pct: dec!(0.25),
        ..Config::default()
    }
}

fn replay(config: &Config, games: &[Game], predictions: &PrecomputedPredictions) -> Vec<LedgerEntry> {
    WalkForwardEngine::new(config, predictions)
        .expect("valid config")
        .run(games)
        .ledger
}

/// Single even-money game at 60% stakes the capped 5%.
#[test]
fn single_game_with_edge_stakes_capped_fraction() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .game(dec!(0.6), "2.0", GameOutcome::Win)
        .build();

    let ledger = replay(&config(), &games, &predictions);

    assert_eq!(ledger.len(), 1);
    let decision = &ledger[0].decision;
    assert_eq!(decision.full_kelly, Some(dec!(0.2)));
    assert_eq!(decision.stake_fraction, dec!(0.05));
    assert_eq!(decision.stake, dec!(50));
    assert_eq!(decision.status, DecisionStatus::Placed);
}

/// Negative edge is a skipped game, not an error.
#[test]
fn negative_edge_records_zero_stake() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .game(dec!(0.4), "2.0", GameOutcome::Win)
        .build();

    let ledger = replay(&config(), &games, &predictions);

    assert_eq!(ledger[0].decision.full_kelly, Some(dec!(-0.2)));
    assert_eq!(ledger[0].decision.stake, Decimal::ZERO);
    assert_eq!(ledger[0].decision.status, DecisionStatus::Skipped);
    assert_eq!(ledger[0].bankroll_after, dec!(1000));
}

/// A long losing streak halts at the first drawdown past 25% and every later
/// game is denied.
#[test]
fn losing_streak_halts_and_denies_the_rest() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .repeat(20, dec!(0.6), "2.0", GameOutcome::Loss)
        .build();

    let run = WalkForwardEngine::new(&config(), &predictions)
        .unwrap()
        .run(&games);
    let ledger = &run.ledger;

    assert_eq!(ledger.len(), 20);

    let halt_at = ledger
        .iter()
        .position(|e| e.mode_after == RiskMode::Halted)
        .expect("run halts");
    assert!(ledger[halt_at].drawdown > dec!(0.25));
    assert!(ledger[..halt_at].iter().all(|e| e.drawdown <= dec!(0.25)));
    // 50, 47.50, 45.12, then damped stakes in cooldown
    assert_eq!(halt_at, 7);
    assert_eq!(ledger[3].decision.status, DecisionStatus::Placed);
    assert_eq!(ledger[4].decision.status, DecisionStatus::Reduced);

    for entry in &ledger[halt_at + 1..] {
        assert_eq!(entry.decision.stake, Decimal::ZERO);
        assert_eq!(entry.decision.status, DecisionStatus::Denied);
        assert_eq!(entry.bankroll_after, ledger[halt_at].bankroll_after);
    }
    assert_eq!(run.halt_reason, Some(HaltReason::Drawdown));
    assert_eq!(run.final_state.bankroll, dec!(736.09));
}

/// Odds too long to settle are flagged like malformed odds; no panic.
#[test]
fn absurd_decimal_odds_flag_only_that_game() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .game(dec!(0.6), "2.0", GameOutcome::Win)
        .game(dec!(0.6), "79228162514264337593543950335", GameOutcome::Win)
        .game(dec!(0.6), "2.0", GameOutcome::Win)
        .build();

    let ledger = replay(&config(), &games, &predictions);

    assert_eq!(ledger.len(), 3);
    assert_eq!(
        ledger[1].decision.status,
        DecisionStatus::Flagged(FlagReason::InvalidOdds)
    );
    assert_eq!(ledger[1].decision.stake, Decimal::ZERO);
    assert_eq!(ledger[1].bankroll_after, dec!(1050));
    assert_eq!(ledger[2].decision.stake, dec!(52.5));
    assert_eq!(ledger[2].bankroll_after, dec!(1102.5));
}

/// Repeated wins at extreme prices cannot compound the bankroll past range.
#[test]
fn repeated_extreme_longshots_never_move_the_bankroll() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .repeat(4, dec!(0.6), "1000000000000000", GameOutcome::Win)
        .build();

    let run = WalkForwardEngine::new(&config(), &predictions)
        .unwrap()
        .run(&games);

    assert_eq!(run.ledger.len(), 4);
    for entry in &run.ledger {
        assert_eq!(
            entry.decision.status,
            DecisionStatus::Flagged(FlagReason::InvalidOdds)
        );
        assert_eq!(entry.profit, Decimal::ZERO);
    }
    assert_eq!(run.final_state.bankroll, dec!(1000));

    let verdict = PerformanceReporter::new(config().go_thresholds()).evaluate(&run.ledger);
    assert_eq!(verdict.summary.bets, 0);
    assert_eq!(verdict.summary.roi, None);
}

/// Malformed odds flag one game and leave the bankroll path intact.
#[test]
fn malformed_odds_flag_only_that_game() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .game(dec!(0.6), "2.0", GameOutcome::Win)
        .game(dec!(0.6), "two to one", GameOutcome::Loss)
        .game(dec!(0.6), "2.0", GameOutcome::Win)
        .build();

    let ledger = replay(&config(), &games, &predictions);

    assert_eq!(
        ledger[1].decision.status,
        DecisionStatus::Flagged(FlagReason::InvalidOdds)
    );
    assert_eq!(ledger[1].decision.stake, Decimal::ZERO);
    assert_eq!(ledger[1].bankroll_after, dec!(1050));
    assert_eq!(ledger[2].bankroll_before, dec!(1050));
    assert_eq!(ledger[2].decision.stake, dec!(52.5));
    assert_eq!(ledger[2].decision.status, DecisionStatus::Placed);
}

fn mixed_history() -> (Vec<Game>, PrecomputedPredictions) {
    use GameOutcome::*;
    SyntheticHistory::season(2022)
        .pattern(dec!(0.58), "-110", &[Win, Loss, Loss, Win, Push, Loss, Win, Win])
        .pattern(dec!(0.35), "+240", &[Loss, Win, Loss, Loss])
        .pattern(dec!(0.62), "4/5", &[Win, Loss, Win, Loss, Loss, Loss, Win])
        .build()
}

#[test]
fn identical_inputs_give_byte_identical_ledgers() {
    let (games, predictions) = mixed_history();

    let first = serde_json::to_string(&replay(&config(), &games, &predictions)).unwrap();
    let second = serde_json::to_string(&replay(&config(), &games, &predictions)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn input_order_does_not_change_the_ledger() {
    let (games, predictions) = mixed_history();
    let mut reversed = games.clone();
    reversed.reverse();

    assert_eq!(
        replay(&config(), &games, &predictions),
        replay(&config(), &reversed, &predictions)
    );
}

#[test]
fn ledger_invariants_hold() {
    let (games, predictions) = mixed_history();
    let cfg = config();
    let ledger = replay(&cfg, &games, &predictions);

    assert_eq!(ledger.len(), games.len());
    let mut peak = cfg.initial_bankroll;
    for (i, entry) in ledger.iter().enumerate() {
        assert_eq!(entry.sequence, i as u64 + 1);
        assert!(entry.peak >= peak, "peak fell at {}", entry.sequence);
        peak = entry.peak;
        assert!(entry.peak >= entry.bankroll_after);
        assert_eq!(entry.bankroll_after, entry.bankroll_before + entry.profit);
        assert!(entry.decision.stake >= Decimal::ZERO);
        assert!(entry.decision.stake <= cfg.max_stake_fraction * entry.bankroll_before);
        if i > 0 {
            assert_eq!(entry.bankroll_before, ledger[i - 1].bankroll_after);
            assert!(entry.decision.kickoff > ledger[i - 1].decision.kickoff);
        }
    }
}

/// Records every game it is asked about.
struct RecordingSource {
    inner: PrecomputedPredictions,
    seen: Mutex<Vec<(String, NaiveDateTime)>>,
}

impl ProbabilitySource for RecordingSource {
    fn predict(&self, game: &GameContext<'_>) -> Result<Prediction, CalibrationError> {
        self.seen
            .lock()
            .unwrap()
            .push((game.id.to_string(), game.kickoff));
        self.inner.predict(game)
    }
}

#[test]
fn source_is_queried_in_order_and_never_with_leaked_features() {
    let (mut games, predictions) = mixed_history();
    let cheat = games[4].id.clone();
    games[4].features.as_of = Some(games[4].kickoff + Duration::hours(3));

    let source = RecordingSource {
        inner: predictions,
        seen: Mutex::new(Vec::new()),
    };
    let ledger = WalkForwardEngine::new(&config(), &source)
        .unwrap()
        .run(&games)
        .ledger;

    let seen = source.seen.into_inner().unwrap();
    assert_eq!(seen.len(), games.len() - 1);
    assert!(seen.iter().all(|(id, _)| *id != cheat));
    assert!(seen.windows(2).all(|w| w[0].1 < w[1].1));

    assert_eq!(
        ledger[4].decision.status,
        DecisionStatus::Flagged(FlagReason::Lookahead)
    );
    assert_eq!(ledger[4].decision.probability, None);
}

#[test]
fn model_trained_past_kickoff_is_flagged() {
    let (games, mut predictions) = SyntheticHistory::season(2023)
        .repeat(3, dec!(0.6), "2.0", GameOutcome::Win)
        .build();
    let mut leaked = predictions.get(&games[1].id).cloned().unwrap();
    leaked.trained_through = Some(games[2].kickoff);
    predictions.insert(leaked);

    let ledger = replay(&config(), &games, &predictions);

    assert_eq!(ledger[0].decision.status, DecisionStatus::Placed);
    assert_eq!(
        ledger[1].decision.status,
        DecisionStatus::Flagged(FlagReason::Lookahead)
    );
    assert_eq!(ledger[2].decision.status, DecisionStatus::Placed);
}

#[test]
fn identical_returns_give_null_sharpe() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .repeat(4, dec!(0.6), "2.0", GameOutcome::Win)
        .build();

    let verdict = PerformanceReporter::new(config().go_thresholds())
        .evaluate(&replay(&config(), &games, &predictions));

    assert_eq!(verdict.summary.bets, 4);
    assert_eq!(verdict.summary.sharpe, None);
    assert_eq!(verdict.summary.win_rate, Some(Decimal::ONE));
    assert_eq!(verdict.decision, GoDecision::Go);
}

#[test]
fn halted_run_is_no_go() {
    let (games, predictions) = SyntheticHistory::season(2023)
        .repeat(20, dec!(0.6), "2.0", GameOutcome::Loss)
        .build();

    let verdict = PerformanceReporter::new(config().go_thresholds())
        .evaluate(&replay(&config(), &games, &predictions));

    assert_eq!(verdict.decision, GoDecision::NoGo);
    assert_eq!(verdict.failed_checks(), vec!["roi", "max_drawdown"]);
    assert_eq!(verdict.summary.final_mode, Some(RiskMode::Halted));
    assert_eq!(verdict.summary.status_counts.denied, 12);
}

#[test]
fn loaded_history_runs_and_reports_to_json() {
    let json = r#"[
        {
            "id": "2023-w01-car-atl", "season": 2023, "week": 1,
            "kickoff": "2023-09-10T13:00:00", "home": "ATL", "away": "CAR",
            "outcome": "win", "odds": "-150",
            "prediction": { "probability": "0.7", "trained_through": "2023-09-01T00:00:00" }
        },
        {
            "id": "2023-w01-det-kc", "season": 2023, "week": 1,
            "kickoff": "2023-09-07T20:20:00", "home": "KC", "away": "DET",
            "side": "away", "outcome": "win", "odds": "+165",
            "prediction": { "probability": "0.45", "trained_through": "2023-09-01T00:00:00" }
        },
        {
            "id": "2023-w01-hou-bal", "season": 2023, "week": 1,
            "kickoff": "2023-09-10T13:00:00", "home": "BAL", "away": "HOU",
            "outcome": "loss", "odds": 1.18
        }
    ]"#;
    let history = parse_history(json, "inline").unwrap();
    let cfg = config();

    let ledger = replay(&cfg, &history.games, &history.predictions);

    // kickoff first, then identifier for the two simultaneous games
    let order: Vec<&str> = ledger.iter().map(|e| e.decision.game_id.as_str()).collect();
    assert_eq!(order, vec!["2023-w01-det-kc", "2023-w01-car-atl", "2023-w01-hou-bal"]);
    assert_eq!(ledger[0].decision.team, "DET");
    assert_eq!(ledger[0].decision.status, DecisionStatus::Placed);
    assert_eq!(
        ledger[2].decision.status,
        DecisionStatus::Flagged(FlagReason::CalibrationUnavailable)
    );

    let verdict = PerformanceReporter::new(cfg.go_thresholds()).evaluate(&ledger);
    let path = std::env::temp_dir().join(format!("gridiron-edge-it-{}.json", std::process::id()));
    JsonFileSink::new(&path)
        .publish("loaded", &ledger, &verdict)
        .unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let round_tripped: Vec<LedgerEntry> = serde_json::from_value(written["ledger"].clone()).unwrap();
    assert_eq!(round_tripped, ledger);
    std::fs::remove_file(&path).ok();
}
