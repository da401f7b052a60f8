//! Odds formats.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OddsError;

static FRACTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s*/\s*(\d+)$").expect("valid fractional odds regex"));

static AMERICAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d+)$").expect("valid american odds regex"));

/// Market odds for the wagered side, tagged by format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "snake_case")]
pub enum Odds {
    /// European odds: total return per unit stake (e.g. 2.10).
    Decimal(Decimal),
    /// Moneyline odds (e.g. +150, -110).
    American(i32),
    /// UK odds `numerator/denominator` (e.g. 5/2).
    Fractional {
        /// Profit part.
        numerator: u32,
        /// Stake part.
        denominator: u32,
    },
}

impl FromStr for Odds {
    type Err = OddsError;

    /// Parse an odds string.
    ///
    /// A `/` selects fractional, a leading sign selects American, anything
    /// else is read as decimal. American odds must carry an explicit sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(OddsError::invalid(s, "empty odds string"));
        }

        if trimmed.contains('/') {
            let caps = FRACTIONAL
                .captures(trimmed)
                .ok_or_else(|| OddsError::invalid(s, "malformed fractional odds"))?;
            let numerator = caps[1]
                .parse()
                .map_err(|_| OddsError::invalid(s, "fractional numerator too large"))?;
            let denominator = caps[2]
                .parse()
                .map_err(|_| OddsError::invalid(s, "fractional denominator too large"))?;
            return Ok(Odds::Fractional {
                numerator,
                denominator,
            });
        }

        if trimmed.starts_with('+') || trimmed.starts_with('-') {
            let caps = AMERICAN
                .captures(trimmed)
                .ok_or_else(|| OddsError::invalid(s, "malformed american odds"))?;
            let magnitude: i32 = caps[2]
                .parse()
                .map_err(|_| OddsError::invalid(s, "american odds too large"))?;
            let value = if &caps[1] == "-" { -magnitude } else { magnitude };
            return Ok(Odds::American(value));
        }

        Decimal::from_str(trimmed)
            .map(Odds::Decimal)
            .map_err(|_| OddsError::invalid(s, "malformed decimal odds"))
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odds::Decimal(d) => write!(f, "{}", d),
            Odds::American(v) if *v > 0 => write!(f, "+{}", v),
            Odds::American(v) => write!(f, "{}", v),
            Odds::Fractional {
                numerator,
                denominator,
            } => write!(f, "{}/{}", numerator, denominator),
        }
    }
}
