//! Fractional Kelly stake sizing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SizingError;

/// Output of a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecommendation {
    /// Unscaled Kelly fraction `f*`; may be negative.
    pub full_kelly: Decimal,
    /// Recommended fraction of bankroll after scaling and capping.
    pub fraction: Decimal,
    /// Stake in currency, rounded down to the stake unit.
    pub stake: Decimal,
}

impl StakeRecommendation {
    /// No edge: the sizer does not recommend a wager.
    pub fn none(full_kelly: Decimal) -> Self {
        Self {
            full_kelly,
            fraction: Decimal::ZERO,
            stake: Decimal::ZERO,
        }
    }

    /// Whether a non-zero stake is recommended.
    pub fn is_bet(&self) -> bool {
        self.stake > Decimal::ZERO
    }
}

/// Fractional Kelly sizer with a hard cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KellySizer {
    kelly_fraction: Decimal,
    max_stake_fraction: Decimal,
    stake_unit: Decimal,
}

impl KellySizer {
    /// Create a sizer. Inputs are assumed validated by [`crate::Config::validate`].
    pub fn new(kelly_fraction: Decimal, max_stake_fraction: Decimal, stake_unit: Decimal) -> Self {
        Self {
            kelly_fraction,
            max_stake_fraction,
            stake_unit,
        }
    }

    /// Kelly multiplier applied to `f*`.
    pub fn kelly_fraction(&self) -> Decimal {
        self.kelly_fraction
    }

    /// Hard cap on the recommended fraction.
    pub fn max_stake_fraction(&self) -> Decimal {
        self.max_stake_fraction
    }

    /// Full Kelly fraction `f* = (b·p − (1−p)) / b`.
    pub fn full_kelly(probability: Decimal, payout_multiplier: Decimal) -> Decimal {
        (payout_multiplier * probability - (Decimal::ONE - probability)) / payout_multiplier
    }

    /// Recommend a stake for one wager.
    ///
    /// A non-positive `f*` is a normal outcome and yields a zero stake.
    pub fn recommend(
        &self,
        probability: Decimal,
        payout_multiplier: Decimal,
        bankroll: Decimal,
    ) -> Result<StakeRecommendation, SizingError> {
        if probability <= Decimal::ZERO || probability >= Decimal::ONE {
            return Err(SizingError::InvalidProbability(probability));
        }
        if payout_multiplier <= Decimal::ZERO {
            return Err(SizingError::InvalidOdds(payout_multiplier));
        }
        if bankroll <= Decimal::ZERO {
            return Err(SizingError::InvalidBankroll(bankroll));
        }

        let full_kelly = Self::full_kelly(probability, payout_multiplier);
        if full_kelly <= Decimal::ZERO {
            return Ok(StakeRecommendation::none(full_kelly));
        }

        let fraction = (self.kelly_fraction * full_kelly).min(self.max_stake_fraction);

        Ok(StakeRecommendation {
            full_kelly,
            fraction,
            stake: self.stake_for(fraction, bankroll)?,
        })
    }

    /// Re-size a recommendation at a different fraction, keeping `f*`.
    ///
    /// Used when the circuit breaker damps the recommended fraction.
    pub fn resize(
        &self,
        recommendation: &StakeRecommendation,
        fraction: Decimal,
        bankroll: Decimal,
    ) -> Result<StakeRecommendation, SizingError> {
        Ok(StakeRecommendation {
            full_kelly: recommendation.full_kelly,
            fraction,
            stake: self.stake_for(fraction, bankroll)?,
        })
    }

    /// Currency stake for a fraction of bankroll, rounded down to the stake unit.
    pub fn stake_for(&self, fraction: Decimal, bankroll: Decimal) -> Result<Decimal, SizingError> {
        if fraction <= Decimal::ZERO || bankroll <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let overflow = SizingError::StakeOverflow { fraction, bankroll };
        let raw = fraction.checked_mul(bankroll).ok_or(overflow.clone())?;
        let remainder = raw.checked_rem(self.stake_unit).ok_or(overflow)?;
        Ok(raw - remainder)
    }

    /// Whether `bankroll` still funds one stake unit at the capped fraction.
    pub fn can_fund(&self, bankroll: Decimal) -> bool {
        matches!(self.stake_for(self.max_stake_fraction, bankroll), Ok(stake) if stake > Decimal::ZERO)
    }
}
