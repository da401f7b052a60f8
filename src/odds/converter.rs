//! Conversion from market odds to implied probability and payout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Odds;
use crate::error::OddsError;

/// Smallest meaningful American moneyline magnitude.
const AMERICAN_MIN_MAGNITUDE: i32 = 100;

/// Largest accepted profit per unit stake (decimal odds 1001.0, +100000, 1000/1).
/// Anything longer is treated as a data error; it would also let a single win
/// push the bankroll past the range of `Decimal`.
pub const MAX_PAYOUT_MULTIPLIER: Decimal = Decimal::ONE_THOUSAND;

/// Odds expressed as probability and payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpliedOdds {
    /// Probability implied by the price (vig included).
    pub implied_probability: Decimal,
    /// Profit per unit stake on a win (`b` in the Kelly formula).
    pub payout_multiplier: Decimal,
}

impl ImpliedOdds {
    /// Model edge over the market price.
    pub fn edge(&self, probability: Decimal) -> Decimal {
        probability - self.implied_probability
    }
}

/// Convert odds into implied probability and payout multiplier.
pub fn convert(odds: &Odds) -> Result<ImpliedOdds, OddsError> {
    let implied = convert_unbounded(odds)?;
    if implied.payout_multiplier > MAX_PAYOUT_MULTIPLIER {
        return Err(OddsError::invalid(odds, "payout multiplier above 1000"));
    }
    Ok(implied)
}

fn convert_unbounded(odds: &Odds) -> Result<ImpliedOdds, OddsError> {
    match *odds {
        Odds::Decimal(d) => {
            if d <= Decimal::ONE {
                return Err(OddsError::invalid(d, "decimal odds must be > 1.0"));
            }
            Ok(ImpliedOdds {
                implied_probability: Decimal::ONE / d,
                payout_multiplier: d - Decimal::ONE,
            })
        }
        Odds::American(v) => {
            if v == 0 {
                return Err(OddsError::invalid(v, "american odds cannot be 0"));
            }
            if v.abs() < AMERICAN_MIN_MAGNITUDE {
                return Err(OddsError::invalid(v, "american odds magnitude must be >= 100"));
            }
            let hundred = Decimal::ONE_HUNDRED;
            let magnitude = Decimal::from(v.abs());
            if v > 0 {
                Ok(ImpliedOdds {
                    implied_probability: hundred / (magnitude + hundred),
                    payout_multiplier: magnitude / hundred,
                })
            } else {
                Ok(ImpliedOdds {
                    implied_probability: magnitude / (magnitude + hundred),
                    payout_multiplier: hundred / magnitude,
                })
            }
        }
        Odds::Fractional {
            numerator,
            denominator,
        } => {
            if numerator == 0 || denominator == 0 {
                return Err(OddsError::invalid(
                    odds,
                    "fractional odds need non-zero numerator and denominator",
                ));
            }
            let n = Decimal::from(numerator);
            let d = Decimal::from(denominator);
            Ok(ImpliedOdds {
                implied_probability: d / (n + d),
                payout_multiplier: n / d,
            })
        }
    }
}

/// Parse an odds string and convert it in one step.
pub fn convert_str(raw: &str) -> Result<(Odds, ImpliedOdds), OddsError> {
    let odds: Odds = raw.parse()?;
    let implied = convert(&odds)?;
    Ok((odds, implied))
}
