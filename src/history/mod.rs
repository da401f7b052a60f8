//! Historical game module.
//!
//! This module handles:
//! - Game records and their replay ordering
//! - The pre-game view handed to probability sources
//! - Loading game history files
//! - Scripted histories for tests

pub mod loader;
pub mod synthetic;
pub mod types;

pub use loader::{load_history, parse_history, LoadedHistory};
pub use synthetic::SyntheticHistory;
pub use types::{FeatureVector, Game, GameContext, GameKey, GameOutcome, Side};
