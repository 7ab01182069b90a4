//! Repetition counting.
//!
//! Two independent counters:
//! - [`RepCounter`] is the live two-phase hysteresis machine driven by the
//!   primary joint angle of the current exercise.
//! - [`estimate_reps`] infers reps after the fact from dips in the form
//!   score sequence, for batch runs that only sample every few frames.

use std::collections::BTreeMap;

use formcoach_pose_model::ExerciseLabel;
use serde::Serialize;

use crate::features::FeatureVector;

/// Movement phase of a tracked exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
}

/// Hysteresis band for one exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepThresholds {
    /// Entering the closed phase requires the angle to drop below this.
    pub low: f64,
    /// Completing a rep requires the angle to rise above this.
    pub high: f64,
    /// Phase the counter starts in and returns to on each rep.
    pub open: Phase,
}

impl RepThresholds {
    /// Band for an exercise, or `None` for exercises without reps.
    pub fn for_exercise(exercise: ExerciseLabel) -> Option<Self> {
        match exercise {
            ExerciseLabel::Squat => Some(Self {
                low: 120.0,
                high: 160.0,
                open: Phase::Up,
            }),
            // arm hangs extended between curls
            ExerciseLabel::BicepCurl => Some(Self {
                low: 90.0,
                high: 150.0,
                open: Phase::Down,
            }),
            ExerciseLabel::PushUp => Some(Self {
                low: 110.0,
                high: 160.0,
                open: Phase::Up,
            }),
            ExerciseLabel::Plank | ExerciseLabel::Unknown => None,
        }
    }

    fn closed(&self) -> Phase {
        match self.open {
            Phase::Up => Phase::Down,
            Phase::Down => Phase::Up,
        }
    }
}

/// Angle that drives the counter for an exercise.
pub fn primary_angle(exercise: ExerciseLabel, features: &FeatureVector) -> Option<f64> {
    match exercise {
        ExerciseLabel::Squat => Some(features.angles.avg_knee()),
        ExerciseLabel::BicepCurl | ExerciseLabel::PushUp => Some(features.angles.avg_elbow()),
        ExerciseLabel::Plank | ExerciseLabel::Unknown => None,
    }
}

/// Spoken confirmation for a completed rep.
pub fn rep_message(exercise: ExerciseLabel, rep: u32) -> Option<String> {
    let text = match exercise {
        ExerciseLabel::Squat => "Great squat!",
        ExerciseLabel::BicepCurl => "Nice curl!",
        ExerciseLabel::PushUp => "Strong push-up!",
        ExerciseLabel::Plank | ExerciseLabel::Unknown => return None,
    };
    Some(format!("{text} Rep {rep}"))
}

/// A completed repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepEvent {
    pub exercise: ExerciseLabel,
    /// Reps of this exercise so far.
    pub exercise_reps: u32,
    /// Reps across all exercises so far.
    pub total_reps: u32,
}

#[derive(Debug, Clone, Copy)]
struct ExerciseState {
    phase: Phase,
    reps: u32,
}

/// Live hysteresis rep counter. Counts never decrease except through [`RepCounter::reset`].
#[derive(Debug, Clone)]
pub struct RepCounter {
    states: BTreeMap<ExerciseLabel, ExerciseState>,
    total: u32,
}

impl RepCounter {
    pub fn new() -> Self {
        let states = ExerciseLabel::ALL
            .iter()
            .filter_map(|&ex| {
                RepThresholds::for_exercise(ex).map(|t| {
                    (
                        ex,
                        ExerciseState {
                            phase: t.open,
                            reps: 0,
                        },
                    )
                })
            })
            .collect();
        Self { states, total: 0 }
    }

    /// Feed one frame's features for the exercise currently being performed.
    pub fn update(&mut self, exercise: ExerciseLabel, features: &FeatureVector) -> Option<RepEvent> {
        let angle = primary_angle(exercise, features)?;
        self.update_angle(exercise, angle)
    }

    /// Feed the primary joint angle directly. Non-finite angles are ignored.
    pub fn update_angle(&mut self, exercise: ExerciseLabel, angle: f64) -> Option<RepEvent> {
        if !angle.is_finite() {
            return None;
        }
        let thresholds = RepThresholds::for_exercise(exercise)?;
        let state = self.states.get_mut(&exercise)?;

        if state.phase == thresholds.open && angle < thresholds.low {
            state.phase = thresholds.closed();
            tracing::debug!(exercise = %exercise, angle, "Entered closed phase");
            None
        } else if state.phase == thresholds.closed() && angle > thresholds.high {
            state.phase = thresholds.open;
            state.reps += 1;
            self.total += 1;
            tracing::info!(
                exercise = %exercise,
                reps = state.reps,
                total = self.total,
                "Repetition completed"
            );
            Some(RepEvent {
                exercise,
                exercise_reps: state.reps,
                total_reps: self.total,
            })
        } else {
            None
        }
    }

    pub fn reps(&self, exercise: ExerciseLabel) -> u32 {
        self.states.get(&exercise).map_or(0, |s| s.reps)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn phase(&self, exercise: ExerciseLabel) -> Option<Phase> {
        self.states.get(&exercise).map(|s| s.phase)
    }

    /// Return every exercise to its open phase with zero reps.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Estimate reps from the form score sequence of a run.
///
/// Counts entries into the region below `mean - stddev` (population
/// standard deviation) and discards the first one as setup. Fewer than
/// `min_scores` scores yield 0.
pub fn estimate_reps(scores: &[u32], min_scores: usize) -> u32 {
    if scores.len() < min_scores.max(1) {
        return 0;
    }

    let n = scores.len() as f64;
    let mean = scores.iter().map(|&s| f64::from(s)).sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|&s| (f64::from(s) - mean).powi(2))
        .sum::<f64>()
        / n;
    let threshold = mean - variance.sqrt();

    let mut dips: u32 = 0;
    let mut in_dip = false;
    for &s in scores {
        let below = f64::from(s) < threshold;
        if below && !in_dip {
            dips += 1;
        }
        in_dip = below;
    }

    dips.saturating_sub(1)
}
