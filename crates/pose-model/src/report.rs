//! Result records handed to the presentation/storage layer.

use serde::{Deserialize, Serialize};

use crate::exercise::ExerciseLabel;

/// A sampled frame whose form score fell below the quality floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    /// Index of the decoded frame.
    pub frame: u64,
    /// Form score of that frame.
    pub score: u32,
    /// Leading issues reported for that frame.
    pub issues: Vec<String>,
}

/// Summary of one completed analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Dominant exercise across all analyzed frames.
    pub exercise_detected: ExerciseLabel,
    /// Share of votes for the dominant exercise, in [0, 1].
    pub confidence: f64,
    /// Mean form score, truncated to an integer.
    pub overall_score: u32,
    /// Estimated repetitions.
    pub rep_count: u32,
    /// Distinct issues in first-seen order.
    pub issues_detected: Vec<String>,
    /// Distinct recommendations in first-seen order.
    pub recommendations: Vec<String>,
    /// Sampled frames that produced a classifiable pose.
    pub frames_analyzed: u64,
    /// Per-frame form scores in analysis order.
    pub form_scores: Vec<u32>,
    /// Frames worth reviewing.
    pub key_frames: Vec<KeyFrame>,
    /// Source duration in seconds.
    pub video_duration: f64,
    /// Source frame rate.
    pub fps: f64,
}

/// What the result consumer receives: a report or an error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisRecord {
    Report(SessionReport),
    Failure { error: String },
}

impl AnalysisRecord {
    pub fn failure(error: impl Into<String>) -> Self {
        AnalysisRecord::Failure {
            error: error.into(),
        }
    }

    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            AnalysisRecord::Report(report) => Some(report),
            AnalysisRecord::Failure { .. } => None,
        }
    }
}
