//! Loading a game history file.
//!
//! The file is a JSON array of game records. A record may carry the
//! prediction made for it, in which case the predictions are gathered into a
//! [`PrecomputedPredictions`] table:
//!
//! ```json
//! [{
//!   "id": "2023-w01-det-kc", "season": 2023, "week": 1,
//!   "kickoff": "2023-09-07T20:20:00", "home": "KC", "away": "DET",
//!   "side": "away", "outcome": "win", "odds": "+165",
//!   "features": { "values": { "elo_diff": -42.0 }, "as_of": "2023-09-06T00:00:00" },
//!   "prediction": { "probability": "0.41", "trained_through": "2023-08-31T00:00:00" }
//! }]
//! ```

use std::path::Path;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::types::{FeatureVector, Game, GameOutcome, Side};
use crate::error::HistoryError;
use crate::probability::{PrecomputedPredictions, Prediction};

/// Games plus any predictions attached to them.
#[derive(Debug, Clone, Default)]
pub struct LoadedHistory {
    /// Games in file order.
    pub games: Vec<Game>,
    /// Predictions found alongside the games.
    pub predictions: PrecomputedPredictions,
}

/// Odds may be published as text ("+150", "5/2") or as a bare decimal number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OddsField {
    Text(String),
    Number(serde_json::Number),
}

impl OddsField {
    fn into_string(self) -> String {
        match self {
            OddsField::Text(s) => s,
            OddsField::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionRecord {
    probability: Decimal,
    #[serde(default)]
    raw_score: Option<f64>,
    #[serde(default)]
    trained_through: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
struct GameRecord {
    id: String,
    season: u16,
    week: u8,
    kickoff: NaiveDateTime,
    home: String,
    away: String,
    #[serde(default)]
    side: Side,
    outcome: GameOutcome,
    odds: OddsField,
    #[serde(default)]
    features: FeatureVector,
    #[serde(default)]
    prediction: Option<PredictionRecord>,
}

/// Read a history file from disk.
pub fn load_history(path: impl AsRef<Path>) -> Result<LoadedHistory, HistoryError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| HistoryError::Read {
        path: origin.clone(),
        source,
    })?;
    let history = parse_history(&raw, &origin)?;
    info!(
        path = %origin,
        games = history.games.len(),
        predictions = history.predictions.len(),
        "Game history loaded"
    );
    Ok(history)
}

/// Parse history JSON; `origin` names the input in errors.
pub fn parse_history(json: &str, origin: &str) -> Result<LoadedHistory, HistoryError> {
    let records: Vec<GameRecord> =
        serde_json::from_str(json).map_err(|source| HistoryError::Parse {
            path: origin.to_string(),
            source,
        })?;

    let mut history = LoadedHistory::default();
    for record in records {
        if let Some(p) = record.prediction {
            history.predictions.insert(Prediction {
                game_id: record.id.clone(),
                probability: p.probability,
                raw_score: p.raw_score,
                trained_through: p.trained_through,
            });
        }
        history.games.push(Game {
            id: record.id,
            season: record.season,
            week: record.week,
            kickoff: record.kickoff,
            home: record.home,
            away: record.away,
            side: record.side,
            outcome: record.outcome,
            odds: record.odds.into_string(),
            features: record.features,
        });
    }
    debug!(origin, games = history.games.len(), "Parsed game records");

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"[
        {
            "id": "2023-w01-det-kc", "season": 2023, "week": 1,
            "kickoff": "2023-09-07T20:20:00", "home": "KC", "away": "DET",
            "side": "away", "outcome": "win", "odds": "+165",
            "features": { "values": { "elo_diff": -42.0 }, "as_of": "2023-09-06T00:00:00" },
            "prediction": { "probability": "0.41", "raw_score": -0.36 }
        },
        {
            "id": "2023-w01-car-atl", "season": 2023, "week": 1,
            "kickoff": "2023-09-10T13:00:00", "home": "ATL", "away": "CAR",
            "outcome": "loss", "odds": 1.65
        }
    ]"#;

    #[test]
    fn parses_games_and_attached_predictions() {
        let history = parse_history(SAMPLE, "sample").unwrap();

        assert_eq!(history.games.len(), 2);
        assert_eq!(history.predictions.len(), 1);

        let first = &history.games[0];
        assert_eq!(first.side, Side::Away);
        assert_eq!(first.team(), "DET");
        assert_eq!(first.odds, "+165");
        assert_eq!(first.features.values.get("elo_diff"), Some(&-42.0));

        let prediction = history.predictions.get("2023-w01-det-kc").unwrap();
        assert_eq!(prediction.probability, dec!(0.41));
        assert_eq!(prediction.raw_score, Some(-0.36));
    }

    #[test]
    fn numeric_odds_and_defaults() {
        let history = parse_history(SAMPLE, "sample").unwrap();
        let second = &history.games[1];

        assert_eq!(second.odds, "1.65");
        assert_eq!(second.side, Side::Home);
        assert_eq!(second.outcome, GameOutcome::Loss);
        assert!(second.features.as_of.is_none());
    }

    #[test]
    fn malformed_odds_still_load() {
        let json = r#"[{"id":"x","season":2023,"week":2,"kickoff":"2023-09-17T13:00:00",
            "home":"A","away":"B","outcome":"push","odds":"n/a"}]"#;
        let history = parse_history(json, "inline").unwrap();
        assert_eq!(history.games[0].odds, "n/a");
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_history("{not json", "broken.json").unwrap_err();
        assert!(matches!(err, HistoryError::Parse { ref path, .. } if path == "broken.json"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_history("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, HistoryError::Read { .. }));
    }
}
