//! Historical game records.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which participant the wager backs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Side {
    /// Home team.
    #[default]
    Home,
    /// Away team.
    Away,
}

/// Realized result for the wagered side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum GameOutcome {
    /// Wagered side won.
    Win,
    /// Wagered side lost.
    Loss,
    /// Stake returned.
    Push,
}

/// Opaque model inputs for one game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Named feature values.
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    /// Instant the features were computed. Must precede kickoff.
    #[serde(default)]
    pub as_of: Option<NaiveDateTime>,
}

impl FeatureVector {
    /// Whether these features could only have been built with information
    /// from `kickoff` or later.
    pub fn leaks_past(&self, kickoff: NaiveDateTime) -> bool {
        self.as_of.is_some_and(|as_of| as_of >= kickoff)
    }
}

/// A completed historical game with the market price for the wagered side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Unique game identifier.
    pub id: String,
    /// Season ordinal.
    pub season: u16,
    /// Week within the season.
    pub week: u8,
    /// Scheduled start.
    pub kickoff: NaiveDateTime,
    /// Home participant.
    pub home: String,
    /// Away participant.
    pub away: String,
    /// Side the wager backs.
    #[serde(default)]
    pub side: Side,
    /// Realized result for `side`.
    pub outcome: GameOutcome,
    /// Market odds for `side` at decision time, as published.
    pub odds: String,
    /// Model inputs.
    #[serde(default)]
    pub features: FeatureVector,
}

impl Game {
    /// Replay ordering key.
    pub fn key(&self) -> GameKey<'_> {
        GameKey {
            kickoff: self.kickoff,
            season: self.season,
            week: self.week,
            id: &self.id,
        }
    }

    /// Participant backed by the wager.
    pub fn team(&self) -> &str {
        match self.side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Everything known before kickoff. The outcome is deliberately absent.
    pub fn context(&self) -> GameContext<'_> {
        GameContext {
            id: &self.id,
            season: self.season,
            week: self.week,
            kickoff: self.kickoff,
            home: &self.home,
            away: &self.away,
            side: self.side,
            odds: &self.odds,
            features: &self.features,
        }
    }
}

/// Total replay order: kickoff, then season, week and identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GameKey<'a> {
    /// Scheduled start.
    pub kickoff: NaiveDateTime,
    /// Season ordinal.
    pub season: u16,
    /// Week ordinal.
    pub week: u8,
    /// Identifier.
    pub id: &'a str,
}

/// Pre-game view of a [`Game`] handed to probability sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameContext<'a> {
    /// Game identifier.
    pub id: &'a str,
    /// Season ordinal.
    pub season: u16,
    /// Week ordinal.
    pub week: u8,
    /// Scheduled start.
    pub kickoff: NaiveDateTime,
    /// Home participant.
    pub home: &'a str,
    /// Away participant.
    pub away: &'a str,
    /// Side the wager backs.
    pub side: Side,
    /// Published odds.
    pub odds: &'a str,
    /// Model inputs.
    pub features: &'a FeatureVector,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 9, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn game(id: &str, kickoff: NaiveDateTime, week: u8) -> Game {
        Game {
            id: id.to_string(),
            season: 2023,
            week,
            kickoff,
            home: "KC".to_string(),
            away: "DET".to_string(),
            side: Side::Away,
            outcome: GameOutcome::Win,
            odds: "+150".to_string(),
            features: FeatureVector::default(),
        }
    }

    #[test]
    fn key_orders_by_kickoff_then_id() {
        let early = game("b", at(7, 20), 1);
        let tie_a = game("a", at(10, 13), 1);
        let tie_c = game("c", at(10, 13), 1);

        let mut keys = vec![tie_c.key(), early.key(), tie_a.key()];
        keys.sort();

        let ids: Vec<&str> = keys.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn team_follows_side() {
        assert_eq!(game("g", at(7, 20), 1).team(), "DET");
    }

    #[test]
    fn features_at_kickoff_leak() {
        let kickoff = at(7, 20);
        let mut features = FeatureVector::default();
        assert!(!features.leaks_past(kickoff));

        features.as_of = Some(at(6, 12));
        assert!(!features.leaks_past(kickoff));

        features.as_of = Some(kickoff);
        assert!(features.leaks_past(kickoff));
    }

    #[test]
    fn outcome_parses_case_insensitively() {
        assert_eq!("WIN".parse::<GameOutcome>().unwrap(), GameOutcome::Win);
        assert_eq!("push".parse::<GameOutcome>().unwrap(), GameOutcome::Push);
        assert_eq!(GameOutcome::Loss.to_string(), "loss");
    }
}
