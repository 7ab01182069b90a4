//! FormCoach Analysis Core
//!
//! Turns per-frame joint positions into exercise decisions:
//! - **Features:** Joint angles, body alignment, visibility, and angular velocity
//! - **Classifier:** Priority-ordered exercise rules plus majority-vote smoothing
//! - **Form:** Table-driven form rules producing a 0-100 score with advice
//! - **Reps:** Live hysteresis counter and a batch estimator over form scores
//! - **Session:** Vote tally and report assembly for a whole analysis run
//!
//! This crate is pure computation: no I/O, no threads.
//! Frame sources are consumed through the `FrameSource` trait.

pub mod classifier;
pub mod features;
pub mod form;
pub mod geometry;
pub mod reps;
pub mod session;

pub use classifier::{classify, ExerciseSmoother};
pub use features::{AngleKind, Feature, FeatureExtractor, FeatureVector, JointAngles};
pub use form::{FormAnalysisResult, FormScorer, RuleSet};
pub use reps::{estimate_reps, RepCounter};
pub use session::{BatchAnalyzer, SessionAggregate};
