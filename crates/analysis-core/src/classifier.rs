//! Exercise classification.
//!
//! [`classify`] is a stateless per-frame vote. [`ExerciseSmoother`] keeps a
//! short window of votes and only moves the visible label when the
//! window's majority is confident enough, so single noisy frames do not
//! make the label flicker.

use std::collections::VecDeque;

use formcoach_common::ClassificationDefaults;
use formcoach_pose_model::ExerciseLabel;
use serde::Serialize;

use crate::features::FeatureVector;

const SQUAT_MAX_KNEE: f64 = 140.0;
const SQUAT_MAX_HIP: f64 = 130.0;
const SQUAT_MIN_STANCE: f64 = 40.0;
const UPRIGHT_MIN_SPINE: f64 = 160.0;

const CURL_MAX_ELBOW: f64 = 120.0;
const STANDING_MIN_TORSO: f64 = 100.0;
const CURL_MAX_LEAN: f64 = 20.0;

const PUSH_UP_MAX_ELBOW: f64 = 130.0;
const PUSH_UP_MAX_TORSO: f64 = 80.0;

const PLANK_MIN_SPINE: f64 = 170.0;
const PLANK_MAX_TORSO: f64 = 60.0;

/// Classify one frame. The first matching rule wins:
/// squat, bicep curl, push-up, plank, then unknown.
pub fn classify(features: &FeatureVector) -> ExerciseLabel {
    let knee = features.angles.avg_knee();
    let hip = features.angles.avg_hip();
    let elbow = features.angles.avg_elbow();
    let spine = features.spine_angle;
    // short torso projection means the body is horizontal
    let torso = features.shoulder_hip_distance;

    if knee < SQUAT_MAX_KNEE
        && hip < SQUAT_MAX_HIP
        && features.foot_distance > SQUAT_MIN_STANCE
        && spine > UPRIGHT_MIN_SPINE
    {
        ExerciseLabel::Squat
    } else if elbow < CURL_MAX_ELBOW
        && torso > STANDING_MIN_TORSO
        && features.torso_lean < CURL_MAX_LEAN
    {
        ExerciseLabel::BicepCurl
    } else if elbow < PUSH_UP_MAX_ELBOW && spine > UPRIGHT_MIN_SPINE && torso < PUSH_UP_MAX_TORSO {
        ExerciseLabel::PushUp
    } else if spine > PLANK_MIN_SPINE && torso < PLANK_MAX_TORSO {
        ExerciseLabel::Plank
    } else {
        ExerciseLabel::Unknown
    }
}

/// The visible label after smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedLabel {
    pub exercise: ExerciseLabel,
    /// Window confidence recorded when `exercise` was last accepted.
    pub confidence: f64,
    /// Whether this update changed the visible label.
    pub changed: bool,
}

/// Majority-vote smoothing over a bounded window of raw labels.
#[derive(Debug, Clone)]
pub struct ExerciseSmoother {
    window: usize,
    min_samples: usize,
    threshold: f64,
    recent: VecDeque<ExerciseLabel>,
    current: ExerciseLabel,
    confidence: f64,
}

impl ExerciseSmoother {
    /// `window` labels are retained; nothing is decided before `min_samples`
    /// arrive; the visible label moves only when the majority share is
    /// strictly greater than `threshold`.
    pub fn new(window: usize, min_samples: usize, threshold: f64) -> Self {
        let window = window.max(1);
        Self {
            window,
            min_samples: min_samples.clamp(1, window),
            threshold: threshold.clamp(0.0, 1.0),
            recent: VecDeque::with_capacity(window),
            current: ExerciseLabel::Unknown,
            confidence: 0.0,
        }
    }

    pub fn from_config(config: &ClassificationDefaults) -> Self {
        Self::new(config.window, config.min_samples, config.confidence_threshold)
    }

    pub fn current(&self) -> ExerciseLabel {
        self.current
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn window_len(&self) -> usize {
        self.recent.len()
    }

    /// Record a raw vote and return the (possibly unchanged) visible label.
    ///
    /// The comparison is strict: a share exactly equal to the threshold
    /// keeps the previous label. With the defaults (window 10, threshold
    /// 0.6) six matching votes out of ten do not switch; seven do.
    pub fn push(&mut self, raw: ExerciseLabel) -> SmoothedLabel {
        self.recent.push_back(raw);
        if self.recent.len() > self.window {
            self.recent.pop_front();
        }

        let mut changed = false;
        if self.recent.len() >= self.min_samples {
            if let Some((label, share)) = self.majority() {
                if share > self.threshold {
                    changed = label != self.current;
                    self.current = label;
                    self.confidence = share;
                }
            }
        }

        SmoothedLabel {
            exercise: self.current,
            confidence: self.confidence,
            changed,
        }
    }

    /// Most frequent label in the window and its share.
    ///
    /// Ties go to the label that appears first in the window.
    pub fn majority(&self) -> Option<(ExerciseLabel, f64)> {
        let mut counts: Vec<(ExerciseLabel, usize)> = Vec::new();
        for label in &self.recent {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((*label, 1)),
            }
        }

        let mut best: Option<(ExerciseLabel, usize)> = None;
        for (label, n) in counts {
            if best.map_or(true, |(_, b)| n > b) {
                best = Some((label, n));
            }
        }
        best.map(|(label, n)| (label, n as f64 / self.recent.len() as f64))
    }

    pub fn reset(&mut self) {
        self.recent.clear();
        self.current = ExerciseLabel::Unknown;
        self.confidence = 0.0;
    }
}

impl Default for ExerciseSmoother {
    fn default() -> Self {
        Self::from_config(&ClassificationDefaults::default())
    }
}
