//! Walk-forward backtester entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gridiron_edge::backtest::{kelly_grid, run_sweep, WalkForwardEngine};
use gridiron_edge::config::Config;
use gridiron_edge::history::load_history;
use gridiron_edge::metrics;
use gridiron_edge::report::{JsonFileSink, LogSink, PerformanceReporter, ReportSink, Verdict};

/// Walk-forward backtester and bet sizer for game-level moneyline wagers.
#[derive(Parser, Debug)]
#[command(name = "gridiron-edge")]
#[command(about = "Replay historical games, size wagers with fractional Kelly and issue a GO/NO-GO verdict")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a game history with one configuration.
    Run {
        /// JSON game history file.
        #[arg(short, long)]
        games: PathBuf,

        /// Write the ledger and verdict to this JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the starting bankroll.
        #[arg(long)]
        initial_bankroll: Option<Decimal>,

        /// Override the Kelly multiplier.
        #[arg(long)]
        kelly_fraction: Option<Decimal>,

        /// Override the per-bet stake cap.
        #[arg(long)]
        max_stake_fraction: Option<Decimal>,

        /// Write Prometheus exposition text to this file after the run.
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Replay a game history once per Kelly multiplier, in parallel.
    Sweep {
        /// JSON game history file.
        #[arg(short, long)]
        games: PathBuf,

        /// Kelly multipliers to try.
        #[arg(long, value_delimiter = ',', default_value = "0.1,0.25,0.5")]
        kelly_fractions: Vec<Decimal>,

        /// Write one JSON report per multiplier beside this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration is loaded before logging so RUST_LOG from .env applies
    let config = Config::load();

    // Initialize logging
    let verbose = args.verbose || config.as_ref().is_ok_and(|c| c.verbose);
    let filter = if verbose {
        EnvFilter::new("gridiron_edge=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            config
                .as_ref()
                .map(|c| EnvFilter::new(&c.rust_log))
                .unwrap_or_else(|_| EnvFilter::new("info"))
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    match args.command {
        Command::CheckConfig => cmd_check_config(config),
        Command::Run {
            games,
            output,
            initial_bankroll,
            kelly_fraction,
            max_stake_fraction,
            metrics_out,
        } => {
            let mut config = config.context("Configuration load failed")?;
            if let Some(v) = initial_bankroll {
                config.initial_bankroll = v;
            }
            if let Some(v) = kelly_fraction {
                config.kelly_fraction = v;
            }
            if let Some(v) = max_stake_fraction {
                config.max_stake_fraction = v;
            }
            cmd_run(config, games, output, metrics_out)
        }
        Command::Sweep {
            games,
            kelly_fractions,
            output,
        } => {
            let config = config.context("Configuration load failed")?;
            cmd_sweep(config, games, kelly_fractions, output).await
        }
    }
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, gridiron_edge::error::ConfigError>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("GRIDIRON EDGE - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Initial Bankroll: {}", config.initial_bankroll);
    println!("  Stake Unit: {}", config.stake_unit);
    println!("  Kelly Fraction: {}", config.kelly_fraction);
    println!("  Max Stake Fraction: {}", config.max_stake_fraction);
    println!(
        "  Drawdown Warning / Halt: {} / {}",
        config.drawdown_warning_pct, config.drawdown_halt_pct
    );
    println!("  Loss Streak Warning: {}", config.consecutive_loss_warning);
    println!(
        "  Cooldown: {} clean bets, stakes x{}",
        config.cooldown_recovery_bets, config.cooldown_damping
    );
    println!("  Bankroll Floor: {}", config.bankroll_floor);
    println!("  Probability Retries: {}", config.probability_retries);
    println!(
        "  GO Thresholds: roi > {}, max drawdown < {}, bets >= {}",
        config.go_min_roi, config.go_max_drawdown, config.go_min_bets
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Replay a history with one configuration.
fn cmd_run(
    config: Config,
    games: PathBuf,
    output: Option<PathBuf>,
    metrics_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let prometheus = match metrics_out {
        Some(path) => Some((install_prometheus()?, path)),
        None => None,
    };

    let history = load_history(&games)?;
    info!(path = %games.display(), games = history.games.len(), "History loaded");

    let engine = WalkForwardEngine::new(&config, &history.predictions)?;
    let run = engine.run(&history.games);
    let verdict = PerformanceReporter::new(config.go_thresholds()).evaluate(&run.ledger);
    metrics::set_final_bankroll("run", run.final_state.bankroll);

    LogSink.publish("run", &run.ledger, &verdict)?;
    if let Some(path) = output {
        JsonFileSink::new(path).publish("run", &run.ledger, &verdict)?;
    }

    if let Some((handle, path)) = prometheus {
        std::fs::write(&path, handle.render())
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    print_verdict("run", &verdict);
    Ok(())
}

/// Replay a history once per Kelly multiplier.
async fn cmd_sweep(
    config: Config,
    games: PathBuf,
    kelly_fractions: Vec<Decimal>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if kelly_fractions.is_empty() {
        anyhow::bail!("at least one Kelly multiplier is required");
    }
    metrics::init_metrics();

    let history = load_history(&games)?;
    info!(path = %games.display(), games = history.games.len(), "History loaded");

    let variants = kelly_grid(&config, &kelly_fractions);
    let outcomes = run_sweep(
        variants,
        Arc::new(history.games),
        Arc::new(history.predictions),
    )
    .await?;

    let mut file_sink = output.map(JsonFileSink::per_label);
    for outcome in &outcomes {
        LogSink.publish(&outcome.label, &outcome.run.ledger, &outcome.verdict)?;
        if let Some(sink) = file_sink.as_mut() {
            sink.publish(&outcome.label, &outcome.run.ledger, &outcome.verdict)?;
        }
        print_verdict(&outcome.label, &outcome.verdict);
    }

    if !outcomes.iter().any(|o| o.verdict.is_go()) {
        warn!("No variant met the GO thresholds");
    }
    Ok(())
}

fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    metrics::init_metrics();
    Ok(handle)
}

fn print_verdict(label: &str, verdict: &Verdict) {
    let s = &verdict.summary;
    let show = |v: Option<Decimal>| v.map(|d| d.round_dp(4).to_string()).unwrap_or_else(|| "n/a".to_string());

    println!("======================================================================");
    println!("{} - {}", label, verdict.decision);
    println!("----------------------------------------------------------------------");
    println!("  Games: {}  Bets: {}  W/L/P: {}/{}/{}", s.games, s.bets, s.wins, s.losses, s.pushes);
    println!("  Win Rate: {}", show(s.win_rate));
    println!("  ROI: {}", show(s.roi));
    println!("  Max Drawdown: {}", s.max_drawdown.round_dp(4));
    println!("  Sharpe: {}", show(s.sharpe));
    println!("  Final Bankroll: {}", s.final_bankroll);
    for check in verdict.checks.iter().filter(|c| !c.passed) {
        println!("  FAILED {}: {} vs {}", check.metric, show(check.value), check.threshold);
    }
    println!("======================================================================");
}
