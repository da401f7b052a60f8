//! Performance reporting module.
//!
//! This module handles:
//! - Ledger statistics (win rate, ROI, drawdown, Sharpe-like ratio)
//! - The GO / NO-GO verdict against configured thresholds
//! - Report sinks (JSON file, log, memory)

pub mod sink;
pub mod summary;
pub mod verdict;

pub use sink::{BacktestReport, JsonFileSink, LogSink, MemorySink, ReportSink};
pub use summary::{sharpe_ratio, summarize, PerformanceSummary, StatusCounts};
pub use verdict::{GoDecision, GoThresholds, PerformanceReporter, ThresholdCheck, Verdict};
