//! Destinations for finished backtests.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use super::verdict::Verdict;
use crate::backtest::LedgerEntry;
use crate::error::Result;

/// Serialized form of a finished backtest.
#[derive(Debug, Serialize)]
pub struct BacktestReport<'a> {
    /// Label of the run (e.g. the sweep variant).
    pub label: &'a str,
    /// RFC 3339 creation time.
    pub generated_at: String,
    /// The verdict and its metrics.
    pub verdict: &'a Verdict,
    /// The full ordered ledger.
    pub ledger: &'a [LedgerEntry],
}

impl<'a> BacktestReport<'a> {
    /// Build a report stamped with the current time.
    pub fn new(label: &'a str, ledger: &'a [LedgerEntry], verdict: &'a Verdict) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            label,
            generated_at,
            verdict,
            ledger,
        }
    }
}

/// Receives the ledger and verdict of each finished run.
pub trait ReportSink {
    /// Hand over one finished run.
    fn publish(&mut self, label: &str, ledger: &[LedgerEntry], verdict: &Verdict) -> Result<()>;
}

/// Writes each report as pretty-printed JSON.
///
/// A single run writes to `path`; labelled runs get `<stem>-<label>.json`
/// next to it.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    labelled: bool,
}

impl JsonFileSink {
    /// Write one report to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            labelled: false,
        }
    }

    /// Write one file per label beside `path`.
    pub fn per_label(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            labelled: true,
        }
    }

    fn target(&self, label: &str) -> PathBuf {
        if !self.labelled {
            return self.path.clone();
        }
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.path.with_file_name(format!("{}-{}.json", stem, safe))
    }
}

impl ReportSink for JsonFileSink {
    fn publish(&mut self, label: &str, ledger: &[LedgerEntry], verdict: &Verdict) -> Result<()> {
        let target = self.target(label);
        let writer = BufWriter::new(File::create(&target)?);
        serde_json::to_writer_pretty(writer, &BacktestReport::new(label, ledger, verdict))?;
        info!(path = %target.display(), label, "Report written");
        Ok(())
    }
}

/// Logs a one-line summary per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn publish(&mut self, label: &str, ledger: &[LedgerEntry], verdict: &Verdict) -> Result<()> {
        let s = &verdict.summary;
        info!(
            label,
            decision = %verdict.decision,
            entries = ledger.len(),
            bets = s.bets,
            win_rate = ?s.win_rate,
            roi = ?s.roi,
            max_drawdown = %s.max_drawdown,
            sharpe = ?s.sharpe,
            final_bankroll = %s.final_bankroll,
            failed = ?verdict.failed_checks(),
            "Backtest result"
        );
        Ok(())
    }
}

/// Keeps published runs in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Runs in publication order.
    pub published: Vec<(String, Vec<LedgerEntry>, Verdict)>,
}

impl ReportSink for MemorySink {
    fn publish(&mut self, label: &str, ledger: &[LedgerEntry], verdict: &Verdict) -> Result<()> {
        self.published
            .push((label.to_string(), ledger.to_vec(), verdict.clone()));
        Ok(())
    }
}
