//! Stake sizing module.
//!
//! Fractional-Kelly sizing of a single binary wager against the bankroll.

pub mod kelly;

pub use kelly::{KellySizer, StakeRecommendation};
