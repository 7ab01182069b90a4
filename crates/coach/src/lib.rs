//! FormCoach Coach
//!
//! Spoken feedback for live sessions:
//! - **Policy:** Turns form scores, reps and issues into coaching messages
//!   (fatigue, rest periods, corrections, encouragement, summaries)
//! - **Voice:** One background worker draining a bounded message queue
//! - **Speech:** Pluggable sinks (log only, external TTS command, in-memory)
//!
//! The policy is deterministic: time is passed in by the caller and
//! message variants rotate instead of being picked at random.

pub mod policy;
pub mod speech;
pub mod tips;
pub mod voice;

pub use policy::{Coach, CoachInput, CoachSettings, CoachingMode, PerformanceSummary};
pub use speech::{CommandSpeech, LogSpeech, MemorySpeech, SpeechSink};
pub use voice::VoiceWorker;
