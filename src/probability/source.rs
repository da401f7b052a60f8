//! The probability capability consumed by the engine.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::history::GameContext;

/// Calibrated win probability for the wagered side of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Game identifier.
    pub game_id: String,
    /// Calibrated probability, expected in (0, 1).
    pub probability: Decimal,
    /// Uncalibrated model output.
    #[serde(default)]
    pub raw_score: Option<f64>,
    /// Latest instant of data used to train the model that produced this.
    #[serde(default)]
    pub trained_through: Option<NaiveDateTime>,
}

impl Prediction {
    /// Whether the producing model saw data from `kickoff` or later.
    pub fn leaks_past(&self, kickoff: NaiveDateTime) -> bool {
        self.trained_through.is_some_and(|cutoff| cutoff >= kickoff)
    }

    /// Whether the probability lies strictly inside (0, 1).
    pub fn is_valid_probability(&self) -> bool {
        self.probability > Decimal::ZERO && self.probability < Decimal::ONE
    }
}

/// Anything that can price a game before it is played.
///
/// Calls are synchronous and made in replay order from a single thread.
/// Implementations only ever see the pre-game [`GameContext`].
pub trait ProbabilitySource {
    /// Produce a calibrated probability for the wagered side.
    fn predict(&self, game: &GameContext<'_>) -> Result<Prediction, CalibrationError>;
}

impl<T: ProbabilitySource + ?Sized> ProbabilitySource for std::sync::Arc<T> {
    fn predict(&self, game: &GameContext<'_>) -> Result<Prediction, CalibrationError> {
        (**self).predict(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn kickoff() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 9, 10)
            .and_then(|d| d.and_hms_opt(13, 0, 0))
            .unwrap()
    }

    #[test]
    fn training_cutoff_at_kickoff_leaks() {
        let mut prediction = Prediction {
            game_id: "g".to_string(),
            probability: dec!(0.55),
            raw_score: None,
            trained_through: None,
        };
        assert!(!prediction.leaks_past(kickoff()));

        prediction.trained_through = Some(kickoff() - chrono::Duration::days(1));
        assert!(!prediction.leaks_past(kickoff()));

        prediction.trained_through = Some(kickoff());
        assert!(prediction.leaks_past(kickoff()));
    }

    #[test]
    fn probability_bounds_are_open() {
        let mut prediction = Prediction {
            game_id: "g".to_string(),
            probability: dec!(0),
            raw_score: None,
            trained_through: None,
        };
        assert!(!prediction.is_valid_probability());
        prediction.probability = dec!(1);
        assert!(!prediction.is_valid_probability());
        prediction.probability = dec!(0.999);
        assert!(prediction.is_valid_probability());
    }
}
