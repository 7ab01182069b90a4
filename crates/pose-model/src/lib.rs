//! FormCoach Pose Model
//!
//! Defines the core data contracts shared by the analysis crates:
//! - **Joints:** Named 2-D landmarks with visibility, one `JointFrame` per sampled frame
//! - **Exercise:** The closed set of exercise labels
//! - **Stream:** JSONL pose streams produced by an external pose provider
//! - **Report:** Result records handed to the presentation/storage layer
//! - **Synthetic:** Deterministic pose generation for fixtures and demos
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! frame dimensions; pixel conversion happens during feature extraction.

pub mod exercise;
pub mod joint;
pub mod report;
pub mod stream;
pub mod synthetic;

pub use exercise::*;
pub use joint::*;
pub use report::*;
pub use stream::*;
