//! On-demand probability from an opaque score model and calibrator.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::source::{Prediction, ProbabilitySource};
use crate::error::CalibrationError;
use crate::history::{FeatureVector, GameContext};

/// A trained model mapping features to a raw score.
pub trait ScoreModel {
    /// Raw, uncalibrated score.
    fn score(&self, features: &FeatureVector) -> Result<f64, CalibrationError>;
}

impl<F> ScoreModel for F
where
    F: Fn(&FeatureVector) -> Result<f64, CalibrationError>,
{
    fn score(&self, features: &FeatureVector) -> Result<f64, CalibrationError> {
        self(features)
    }
}

/// A fitted calibrator mapping a raw score to a win probability.
pub trait Calibrator {
    /// Calibrated probability for `raw_score`.
    fn calibrate(&self, raw_score: f64) -> f64;
}

impl<F> Calibrator for F
where
    F: Fn(f64) -> f64,
{
    fn calibrate(&self, raw_score: f64) -> f64 {
        self(raw_score)
    }
}

/// Scores and calibrates each game when the engine asks for it.
#[derive(Debug, Clone)]
pub struct ModelProbabilitySource<M, C> {
    model: M,
    calibrator: C,
    trained_through: Option<NaiveDateTime>,
}

impl<M: ScoreModel, C: Calibrator> ModelProbabilitySource<M, C> {
    /// Combine a model and calibrator.
    pub fn new(model: M, calibrator: C) -> Self {
        Self {
            model,
            calibrator,
            trained_through: None,
        }
    }

    /// Record the training data cutoff so the engine can reject leaks.
    pub fn trained_through(mut self, cutoff: NaiveDateTime) -> Self {
        self.trained_through = Some(cutoff);
        self
    }
}

impl<M: ScoreModel, C: Calibrator> ProbabilitySource for ModelProbabilitySource<M, C> {
    fn predict(&self, game: &GameContext<'_>) -> Result<Prediction, CalibrationError> {
        let raw = self.model.score(game.features)?;
        let calibrated = self.calibrator.calibrate(raw);
        let probability = Decimal::try_from(calibrated).map_err(|_| {
            CalibrationError::Unavailable(format!("calibrator returned non-finite {}", calibrated))
        })?;

        Ok(Prediction {
            game_id: game.id.to_string(),
            probability,
            raw_score: Some(raw),
            trained_through: self.trained_through,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Game, GameOutcome, Side};
    use chrono::NaiveDate;

    fn game(elo_diff: f64) -> Game {
        let mut features = FeatureVector::default();
        features.values.insert("elo_diff".to_string(), elo_diff);
        Game {
            id: "2023-w1-det-kc".to_string(),
            season: 2023,
            week: 1,
            kickoff: NaiveDate::from_ymd_opt(2023, 9, 7)
                .and_then(|d| d.and_hms_opt(20, 20, 0))
                .unwrap(),
            home: "KC".to_string(),
            away: "DET".to_string(),
            side: Side::Home,
            outcome: GameOutcome::Loss,
            odds: "-200".to_string(),
            features,
        }
    }

    fn elo_model(features: &FeatureVector) -> Result<f64, CalibrationError> {
        features
            .values
            .get("elo_diff")
            .map(|d| d / 400.0)
            .ok_or_else(|| CalibrationError::Unavailable("missing elo_diff".to_string()))
    }

    fn logistic(raw: f64) -> f64 {
        1.0 / (1.0 + (-raw).exp())
    }

    #[test]
    fn composes_model_and_calibrator() {
        let source = ModelProbabilitySource::new(elo_model, logistic);
        let g = game(0.0);

        let prediction = source.predict(&g.context()).unwrap();

        assert_eq!(prediction.game_id, g.id);
        assert_eq!(prediction.probability, Decimal::new(5, 1));
        assert_eq!(prediction.raw_score, Some(0.0));
    }

    #[test]
    fn model_failure_propagates() {
        let source = ModelProbabilitySource::new(elo_model, logistic);
        let mut g = game(0.0);
        g.features.values.clear();

        assert!(source.predict(&g.context()).is_err());
    }

    #[test]
    fn non_finite_probability_is_unavailable() {
        let source = ModelProbabilitySource::new(elo_model, |_raw: f64| f64::NAN);
        let g = game(10.0);

        assert!(matches!(
            source.predict(&g.context()),
            Err(CalibrationError::Unavailable(_))
        ));
    }

    #[test]
    fn training_cutoff_is_attached() {
        let cutoff = NaiveDate::from_ymd_opt(2023, 8, 31)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let source = ModelProbabilitySource::new(elo_model, logistic).trained_through(cutoff);
        let g = game(100.0);

        assert_eq!(source.predict(&g.context()).unwrap().trained_through, Some(cutoff));
    }
}
