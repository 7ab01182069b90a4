//! FormCoach Live Engine
//!
//! Runs the per-frame analysis loop for a live session:
//! - **Analysis:** extract → classify (smoothed) → score → count, strictly in order
//! - **Coaching:** rep announcements and interval-gated coach feedback,
//!   handed to the background voice worker
//! - **Control:** stop signal, atomic reset, consecutive source-error guard
//!
//! All session state is owned by one [`LiveSession`]; nothing is shared
//! between sessions.

pub mod session;

pub use session::{FrameOutcome, LiveSession, LiveSettings, LiveSummary, StopReason, TimeBase};
