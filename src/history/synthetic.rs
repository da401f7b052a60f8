//! Scripted game histories for tests.
//!
//! Generates data only. Synthetic games go through the same engine as real
//! ones; nothing in the engine knows whether its input was generated.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::types::{FeatureVector, Game, GameOutcome, Side};
use crate::probability::{PrecomputedPredictions, Prediction};

/// Builder for a season of scripted games, one kickoff per day.
#[derive(Debug, Clone)]
pub struct SyntheticHistory {
    season: u16,
    start: NaiveDateTime,
    games: Vec<Game>,
    predictions: PrecomputedPredictions,
}

impl SyntheticHistory {
    /// Start a season with the first kickoff at `start`.
    pub fn new(season: u16, start: NaiveDateTime) -> Self {
        Self {
            season,
            start,
            games: Vec::new(),
            predictions: PrecomputedPredictions::new(),
        }
    }

    /// Season starting on September 7th, 20:20.
    pub fn season(season: u16) -> Self {
        let start = NaiveDate::from_ymd_opt(i32::from(season), 9, 7)
            .and_then(|d| d.and_hms_opt(20, 20, 0))
            .unwrap_or_default();
        Self::new(season, start)
    }

    /// Append a game priced at `odds` that the model gives `probability`.
    pub fn game(mut self, probability: Decimal, odds: &str, outcome: GameOutcome) -> Self {
        let index = self.games.len();
        let kickoff = self.start + Duration::days(index as i64);
        let id = format!("{}-g{:03}", self.season, index + 1);

        let mut features = FeatureVector {
            as_of: Some(kickoff - Duration::hours(12)),
            ..FeatureVector::default()
        };
        features.values.insert("index".to_string(), index as f64);

        self.predictions.insert(Prediction {
            game_id: id.clone(),
            probability,
            raw_score: None,
            trained_through: Some(self.start - Duration::days(1)),
        });
        self.games.push(Game {
            id,
            season: self.season,
            week: (index / 7 + 1).min(u8::MAX as usize) as u8,
            kickoff,
            home: format!("H{}", index % 16),
            away: format!("A{}", index % 16),
            side: Side::Home,
            outcome,
            odds: odds.to_string(),
            features,
        });
        self
    }

    /// Append `count` identical games.
    pub fn repeat(mut self, count: usize, probability: Decimal, odds: &str, outcome: GameOutcome) -> Self {
        for _ in 0..count {
            self = self.game(probability, odds, outcome);
        }
        self
    }

    /// Append games cycling through `outcomes`.
    pub fn pattern(mut self, probability: Decimal, odds: &str, outcomes: &[GameOutcome]) -> Self {
        for &outcome in outcomes {
            self = self.game(probability, odds, outcome);
        }
        self
    }

    /// Finish, returning games in kickoff order plus their predictions.
    pub fn build(self) -> (Vec<Game>, PrecomputedPredictions) {
        (self.games, self.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn builds_daily_games_with_predictions() {
        let (games, predictions) = SyntheticHistory::season(2023)
            .game(dec!(0.6), "2.0", GameOutcome::Win)
            .repeat(8, dec!(0.55), "-110", GameOutcome::Loss)
            .build();

        assert_eq!(games.len(), 9);
        assert_eq!(predictions.len(), 9);
        assert_eq!(games[0].id, "2023-g001");
        assert_eq!(games[1].kickoff - games[0].kickoff, Duration::days(1));
        assert_eq!(games[7].week, 2);
        assert!(games.iter().all(|g| !g.features.leaks_past(g.kickoff)));
        assert!(games
            .iter()
            .all(|g| !predictions.get(&g.id).unwrap().leaks_past(g.kickoff)));
    }
}
