//! Predictions computed for a whole run before replay begins.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::source::{Prediction, ProbabilitySource};
use crate::error::CalibrationError;
use crate::history::{Game, GameContext};

/// Prediction table keyed by game identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrecomputedPredictions {
    by_game: HashMap<String, Prediction>,
}

impl PrecomputedPredictions {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the prediction for its game.
    pub fn insert(&mut self, prediction: Prediction) -> Option<Prediction> {
        self.by_game.insert(prediction.game_id.clone(), prediction)
    }

    /// Look up a game.
    pub fn get(&self, game_id: &str) -> Option<&Prediction> {
        self.by_game.get(game_id)
    }

    /// Number of games covered.
    pub fn len(&self) -> usize {
        self.by_game.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_game.is_empty()
    }

    /// Batch an on-demand source over `games` so replay never waits on it.
    ///
    /// Games the source cannot price are left out; the engine flags them.
    pub fn precompute<S: ProbabilitySource + ?Sized>(source: &S, games: &[Game]) -> Self {
        let mut table = Self::new();
        for game in games {
            match source.predict(&game.context()) {
                Ok(prediction) => {
                    table.insert(prediction);
                }
                Err(e) => warn!(game = %game.id, error = %e, "Prediction unavailable during precompute"),
            }
        }
        debug!(covered = table.len(), total = games.len(), "Predictions precomputed");
        table
    }
}

impl FromIterator<Prediction> for PrecomputedPredictions {
    fn from_iter<I: IntoIterator<Item = Prediction>>(iter: I) -> Self {
        let mut table = Self::new();
        for prediction in iter {
            table.insert(prediction);
        }
        table
    }
}

impl ProbabilitySource for PrecomputedPredictions {
    fn predict(&self, game: &GameContext<'_>) -> Result<Prediction, CalibrationError> {
        self.get(game.id)
            .cloned()
            .ok_or_else(|| CalibrationError::Missing {
                game_id: game.id.to_string(),
            })
    }
}
