//! Probability source module.
//!
//! The model and its calibrator are external collaborators. This module only
//! defines the capability the engine consumes and two ways of providing it:
//! - A table of predictions computed before replay begins
//! - An on-demand composition of a score model and a calibrator

pub mod model;
pub mod precomputed;
pub mod source;

pub use model::{Calibrator, ModelProbabilitySource, ScoreModel};
pub use precomputed::PrecomputedPredictions;
pub use source::{Prediction, ProbabilitySource};
