//! Coaching policy.
//!
//! [`Coach::update`] is called once per analyzed frame. It tracks form
//! scores, completed reps and the exercise being performed, detects
//! fatigue and rep-rate problems, schedules rest periods and, at most
//! once per cooldown, returns one message for the caller to speak.

use std::collections::VecDeque;

use formcoach_common::{CoachingConfig, IntervalGate};
use formcoach_pose_model::ExerciseLabel;
use serde::Serialize;

use crate::tips;

const FORM_HISTORY: usize = 100;
const REP_HISTORY: usize = 50;
const EXERCISE_HISTORY: usize = 20;

/// Scores considered when looking for fatigue.
const FATIGUE_WINDOW: usize = 10;
/// Scores considered for the end-of-session trend.
const TREND_WINDOW: usize = 5;

/// Reps within this many seconds count toward the current rep rate.
const RATE_WINDOW_SECS: f64 = 60.0;
/// Rest announcements are only made right after a rest starts.
const REST_ANNOUNCE_SECS: f64 = 5.0;
/// Scores in the good band are praised on every Nth coaching opportunity.
const GOOD_BAND_PRAISE_EVERY: u64 = 10;

const EXCELLENT: f64 = 90.0;
const GOOD: f64 = 75.0;
const NEEDS_IMPROVEMENT: f64 = 60.0;
const POOR: f64 = 40.0;

pub const REST_START_MESSAGE: &str = "Take a breather. You've earned it!";
pub const REST_DONE_MESSAGE: &str = "Rest complete! Ready for more?";
pub const FALLBACK_CORRECTION: &str = "Focus on your form. Slow down if needed.";
pub const SLOW_DOWN_MESSAGE: &str = "Great energy! Slow down and control each rep.";
pub const NEW_SESSION_MESSAGE: &str = "New session started! Let's make it count!";

/// Timing and rest parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachSettings {
    /// Minimum seconds between two coaching messages.
    pub cooldown_secs: f64,
    /// Length of a recommended rest.
    pub rest_duration_secs: f64,
    /// Reps after which a rest is recommended.
    pub rest_rep_threshold: u32,
}

impl CoachSettings {
    pub fn from_config(config: &CoachingConfig) -> Self {
        Self {
            cooldown_secs: config.cooldown_secs,
            rest_duration_secs: config.rest_duration_secs,
            rest_rep_threshold: config.rest_rep_threshold,
        }
    }
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self::from_config(&CoachingConfig::default())
    }
}

/// Pacing state derived from the recent rep rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingMode {
    Encouragement,
    SlowDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

impl PerformanceLevel {
    fn from_average(avg: f64) -> Self {
        if avg >= EXCELLENT {
            PerformanceLevel::Excellent
        } else if avg >= GOOD {
            PerformanceLevel::Good
        } else if avg >= NEEDS_IMPROVEMENT {
            PerformanceLevel::NeedsImprovement
        } else {
            PerformanceLevel::Poor
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::NeedsImprovement => "needs improvement",
            PerformanceLevel::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormTrend {
    Improving,
    Declining,
    Stable,
}

/// Snapshot of the session so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub session_minutes: f64,
    pub total_reps: u32,
    pub average_form_score: f64,
    /// Reps per minute over the whole session.
    pub rep_rate: f64,
    pub form_trend: FormTrend,
    pub performance_level: PerformanceLevel,
    pub primary_exercise: ExerciseLabel,
}

/// What the coach needs to know about one analyzed frame.
#[derive(Debug, Clone, Copy)]
pub struct CoachInput<'a> {
    /// Seconds on the session time base.
    pub now_secs: f64,
    pub form_score: u32,
    /// Total completed reps so far.
    pub rep_count: u32,
    pub exercise: ExerciseLabel,
    pub issues: &'a [String],
    pub recommendations: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RestState {
    Active,
    Resting { since: f64, announced: bool },
}

/// Session-scoped coaching policy.
#[derive(Debug, Clone)]
pub struct Coach {
    settings: CoachSettings,
    session_start: f64,
    form_history: VecDeque<u32>,
    rep_times: VecDeque<f64>,
    exercise_history: VecDeque<ExerciseLabel>,
    current_exercise: ExerciseLabel,
    mode: CoachingMode,
    gate: IntervalGate,
    fatigued: bool,
    rest: RestState,
    last_rep_count: u32,
    reps_at_last_rest: u32,
    scores_since_rest: usize,
    good_band_seen: u64,
    rotation: usize,
}

impl Coach {
    pub fn new(settings: CoachSettings, now_secs: f64) -> Self {
        let gate = IntervalGate::new(settings.cooldown_secs);
        Self {
            settings,
            session_start: now_secs,
            form_history: VecDeque::with_capacity(FORM_HISTORY),
            rep_times: VecDeque::with_capacity(REP_HISTORY),
            exercise_history: VecDeque::with_capacity(EXERCISE_HISTORY),
            current_exercise: ExerciseLabel::Unknown,
            mode: CoachingMode::Encouragement,
            gate,
            fatigued: false,
            rest: RestState::Active,
            last_rep_count: 0,
            reps_at_last_rest: 0,
            scores_since_rest: 0,
            good_band_seen: 0,
            rotation: 0,
        }
    }

    pub fn settings(&self) -> &CoachSettings {
        &self.settings
    }

    pub fn mode(&self) -> CoachingMode {
        self.mode
    }

    pub fn is_fatigued(&self) -> bool {
        self.fatigued
    }

    pub fn is_resting(&self) -> bool {
        matches!(self.rest, RestState::Resting { .. })
    }

    /// Feed one analyzed frame. Returns a message to speak, if any.
    pub fn update(&mut self, input: &CoachInput<'_>) -> Option<String> {
        push_bounded(&mut self.form_history, input.form_score, FORM_HISTORY);
        push_bounded(&mut self.exercise_history, input.exercise, EXERCISE_HISTORY);
        self.current_exercise = input.exercise;
        self.scores_since_rest += 1;

        if input.rep_count > self.last_rep_count {
            push_bounded(&mut self.rep_times, input.now_secs, REP_HISTORY);
        }
        self.last_rep_count = input.rep_count;

        self.analyze(input);

        if self.gate.should_fire(input.now_secs) {
            self.coach(input)
        } else {
            None
        }
    }

    fn analyze(&mut self, input: &CoachInput<'_>) {
        if self.scores_since_rest >= FATIGUE_WINDOW && self.form_history.len() >= FATIGUE_WINDOW {
            let recent: Vec<f64> = self
                .form_history
                .iter()
                .skip(self.form_history.len() - FATIGUE_WINDOW)
                .map(|&s| f64::from(s))
                .collect();
            let avg = mean(&recent);
            let trend = slope(&recent);

            if avg < NEEDS_IMPROVEMENT && trend < -2.0 {
                if !self.fatigued {
                    tracing::info!(avg, trend, "Fatigue detected");
                }
                self.fatigued = true;
            } else if avg > GOOD && trend > 1.0 {
                self.fatigued = false;
            }
        }

        if self.rep_times.len() >= 5 {
            let recent = self
                .rep_times
                .iter()
                .filter(|&&t| input.now_secs - t < RATE_WINDOW_SECS)
                .count();
            let mode = if recent > 20 {
                CoachingMode::SlowDown
            } else if recent < 5 && input.rep_count > 5 {
                CoachingMode::Encouragement
            } else {
                self.mode
            };
            if mode != self.mode {
                tracing::debug!(?mode, reps_last_minute = recent, "Coaching mode changed");
                self.mode = mode;
            }
        }

        let reps_since_rest = input.rep_count.saturating_sub(self.reps_at_last_rest);
        let due = self.fatigued || reps_since_rest >= self.settings.rest_rep_threshold;
        if due && self.rest == RestState::Active {
            tracing::info!(
                fatigued = self.fatigued,
                reps_since_rest,
                "Rest recommended"
            );
            self.rest = RestState::Resting {
                since: input.now_secs,
                announced: false,
            };
        }
    }

    fn coach(&mut self, input: &CoachInput<'_>) -> Option<String> {
        if let RestState::Resting { since, announced } = self.rest {
            let elapsed = input.now_secs - since;
            if elapsed < self.settings.rest_duration_secs {
                if !announced && elapsed < REST_ANNOUNCE_SECS {
                    self.rest = RestState::Resting {
                        since,
                        announced: true,
                    };
                    return Some(REST_START_MESSAGE.to_string());
                }
                return None;
            }
            self.rest = RestState::Active;
            self.fatigued = false;
            self.reps_at_last_rest = input.rep_count;
            self.scores_since_rest = 0;
            return Some(REST_DONE_MESSAGE.to_string());
        }

        let score = f64::from(input.form_score);
        if score < POOR {
            Some(self.correction(input.issues, input.recommendations))
        } else if score < NEEDS_IMPROVEMENT {
            Some(self.improvement(input.recommendations))
        } else if score > EXCELLENT {
            Some(self.encouragement())
        } else {
            self.good_band_seen += 1;
            if self.good_band_seen % GOOD_BAND_PRAISE_EVERY == 0 {
                Some(self.encouragement())
            } else {
                None
            }
        }
    }

    fn correction(&self, issues: &[String], recommendations: &[String]) -> String {
        let (Some(issue), Some(recommendation)) = (issues.first(), recommendations.first()) else {
            return FALLBACK_CORRECTION.to_string();
        };
        tips::issue_advice(self.current_exercise, issue)
            .map(str::to_string)
            .unwrap_or_else(|| recommendation.clone())
    }

    fn improvement(&mut self, recommendations: &[String]) -> String {
        let lead = self.pick(tips::IMPROVEMENT);
        match recommendations.first() {
            Some(advice) => format!("{lead} {advice}"),
            None => lead.to_string(),
        }
    }

    fn encouragement(&mut self) -> String {
        if self.mode == CoachingMode::SlowDown {
            return SLOW_DOWN_MESSAGE.to_string();
        }
        self.pick(tips::encouragement(self.current_exercise)).to_string()
    }

    fn pick(&mut self, options: &'static [&'static str]) -> &'static str {
        let choice = options[self.rotation % options.len()];
        self.rotation = self.rotation.wrapping_add(1);
        choice
    }

    /// A form tip for `exercise`, or for the current exercise.
    pub fn tip(&mut self, exercise: Option<ExerciseLabel>) -> String {
        let exercise = exercise.unwrap_or(self.current_exercise);
        let tip = self.pick(tips::form_tips(exercise));
        if tips::has_specific_tips(exercise) {
            format!("Pro tip: {tip}")
        } else {
            format!("Remember: {tip}")
        }
    }

    /// Session statistics, or `None` before the first update.
    pub fn summary(&self, now_secs: f64) -> Option<PerformanceSummary> {
        if self.form_history.is_empty() {
            return None;
        }

        let scores: Vec<f64> = self.form_history.iter().map(|&s| f64::from(s)).collect();
        let average = mean(&scores);
        let elapsed = (now_secs - self.session_start).max(0.0);
        let total_reps = self.last_rep_count;

        let form_trend = if scores.len() >= TREND_WINDOW {
            let t = slope(&scores[scores.len() - TREND_WINDOW..]);
            if t > 0.0 {
                FormTrend::Improving
            } else if t < -1.0 {
                FormTrend::Declining
            } else {
                FormTrend::Stable
            }
        } else {
            FormTrend::Stable
        };

        Some(PerformanceSummary {
            session_minutes: elapsed / 60.0,
            total_reps,
            average_form_score: average,
            rep_rate: if elapsed > 0.0 {
                f64::from(total_reps) / elapsed * 60.0
            } else {
                0.0
            },
            form_trend,
            performance_level: PerformanceLevel::from_average(average),
            primary_exercise: self.primary_exercise(),
        })
    }

    /// End-of-workout messages.
    pub fn workout_summary(&self, now_secs: f64) -> Vec<String> {
        let Some(summary) = self.summary(now_secs) else {
            return vec!["No data available yet.".to_string()];
        };

        let trend = match summary.form_trend {
            FormTrend::Improving => "Your form improved during the session - excellent progress!",
            FormTrend::Declining => {
                "Form declined toward the end - consider shorter sets or more rest."
            }
            FormTrend::Stable => "You maintained consistent form throughout.",
        };
        let advice = match summary.performance_level {
            PerformanceLevel::Excellent => {
                "Outstanding work! You're ready for more challenging variations."
            }
            PerformanceLevel::Good => {
                "Solid session! Focus on consistency for continued improvement."
            }
            PerformanceLevel::NeedsImprovement => {
                "Good effort! Practice with lighter weights or fewer reps to master the form."
            }
            PerformanceLevel::Poor => "Remember, quality over quantity. Focus on perfect form first.",
        };

        vec![
            format!(
                "Great workout! You completed {} reps with {} form. {trend}",
                summary.total_reps,
                summary.performance_level.describe()
            ),
            advice.to_string(),
        ]
    }

    fn primary_exercise(&self) -> ExerciseLabel {
        let mut counts: Vec<(ExerciseLabel, usize)> = Vec::new();
        for label in &self.exercise_history {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((*label, 1)),
            }
        }
        let mut best = (ExerciseLabel::Unknown, 0);
        for (label, n) in counts {
            if n > best.1 {
                best = (label, n);
            }
        }
        best.0
    }

    /// Start a new session. Returns the greeting to speak.
    pub fn reset(&mut self, now_secs: f64) -> String {
        *self = Self::new(self.settings.clone(), now_secs);
        NEW_SESSION_MESSAGE.to_string()
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, cap: usize) {
    if queue.len() == cap {
        queue.pop_front();
    }
    queue.push_back(value);
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Least-squares slope of `values` against their index.
fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(now: f64, score: u32, reps: u32) -> CoachInput<'static> {
        CoachInput {
            now_secs: now,
            form_score: score,
            rep_count: reps,
            exercise: ExerciseLabel::Squat,
            issues: &[],
            recommendations: &[],
        }
    }

    fn coach() -> Coach {
        Coach::new(CoachSettings::default(), 0.0)
    }

    #[test]
    fn test_slope() {
        assert_eq!(slope(&[1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_eq!(slope(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(slope(&[7.0]), 0.0);
        assert!((slope(&[90.0, 80.0, 70.0]) + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_cooldown_limits_messages() {
        let mut coach = coach();
        assert!(coach.update(&input(0.0, 95, 0)).is_some());
        assert!(coach.update(&input(2.0, 95, 0)).is_none());
        assert!(coach.update(&input(5.0, 95, 0)).is_none());
        assert!(coach.update(&input(5.5, 95, 0)).is_some());
    }

    #[test]
    fn test_excellent_form_rotates_encouragement() {
        let mut coach = coach();
        let a = coach.update(&input(0.0, 95, 0)).unwrap();
        let b = coach.update(&input(10.0, 95, 0)).unwrap();
        assert_eq!(a, "Strong squats! Keep it up!");
        assert_eq!(b, "Great depth on that one!");
    }

    #[test]
    fn test_poor_form_uses_issue_advice() {
        let mut coach = coach();
        let issues = vec!["Not squatting deep enough".to_string()];
        let recs = vec!["Go deeper until thighs are parallel".to_string()];
        let msg = coach
            .update(&CoachInput {
                issues: &issues,
                recommendations: &recs,
                ..input(0.0, 30, 0)
            })
            .unwrap();
        assert_eq!(msg, "Focus on proper depth - thighs parallel to ground");
    }

    #[test]
    fn test_poor_form_falls_back() {
        let mut coach = coach();
        assert_eq!(
            coach.update(&input(0.0, 20, 0)).as_deref(),
            Some(FALLBACK_CORRECTION)
        );

        let issues = vec!["Moving too quickly".to_string()];
        let recs = vec!["Slow down for better control".to_string()];
        let msg = coach
            .update(&CoachInput {
                issues: &issues,
                recommendations: &recs,
                ..input(10.0, 30, 0)
            })
            .unwrap();
        assert_eq!(msg, "Slow down for better control");
    }

    #[test]
    fn test_improvement_band_combines_advice() {
        let mut coach = coach();
        let recs = vec!["Widen stance to shoulder width".to_string()];
        let msg = coach
            .update(&CoachInput {
                recommendations: &recs,
                ..input(0.0, 50, 0)
            })
            .unwrap();
        assert_eq!(
            msg,
            "Good effort! Let's fine-tune that form. Widen stance to shoulder width"
        );
    }

    #[test]
    fn test_good_band_praises_occasionally() {
        let mut coach = coach();
        let spoken: Vec<Option<String>> = (0..10)
            .map(|i| coach.update(&input(i as f64 * 10.0, 80, 0)))
            .collect();
        assert!(spoken[..9].iter().all(Option::is_none));
        assert!(spoken[9].is_some());
    }

    #[test]
    fn test_rest_after_rep_threshold() {
        let mut coach = coach();
        assert!(coach.update(&input(0.0, 80, 14)).is_none());
        assert!(!coach.is_resting());

        let msg = coach.update(&input(10.0, 80, 15));
        assert!(coach.is_resting());
        assert_eq!(msg.as_deref(), Some(REST_START_MESSAGE));

        // quiet while resting
        assert!(coach.update(&input(20.0, 95, 15)).is_none());
        assert!(coach.update(&input(40.0, 95, 15)).is_none());

        let msg = coach.update(&input(71.0, 95, 15));
        assert_eq!(msg.as_deref(), Some(REST_DONE_MESSAGE));
        assert!(!coach.is_resting());

        // the same rep total does not trigger another rest
        coach.update(&input(80.0, 95, 15));
        assert!(!coach.is_resting());
    }

    #[test]
    fn test_fatigue_from_declining_scores() {
        let mut coach = coach();
        for (i, score) in [70, 68, 66, 62, 58, 55, 52, 48, 45, 40].iter().enumerate() {
            coach.update(&input(i as f64, *score, 0));
        }
        assert!(coach.is_fatigued());
        assert!(coach.is_resting());
    }

    #[test]
    fn test_fast_reps_switch_to_slow_down() {
        let mut coach = coach();
        for rep in 1..=22 {
            coach.update(&input(rep as f64 * 2.0, 95, rep));
        }
        assert_eq!(coach.mode(), CoachingMode::SlowDown);
    }

    #[test]
    fn test_tips() {
        let mut coach = coach();
        assert_eq!(
            coach.tip(Some(ExerciseLabel::PushUp)),
            "Pro tip: Keep body in straight line"
        );
        assert_eq!(
            coach.tip(Some(ExerciseLabel::Plank)),
            "Remember: Quality over quantity always"
        );
    }

    #[test]
    fn test_summary() {
        let mut coach = coach();
        assert!(coach.summary(10.0).is_none());
        for (i, score) in [70, 75, 80, 85, 90].iter().enumerate() {
            coach.update(&input(i as f64 * 12.0, *score, i as u32));
        }
        let summary = coach.summary(120.0).unwrap();
        assert_eq!(summary.total_reps, 4);
        assert_eq!(summary.average_form_score, 80.0);
        assert_eq!(summary.form_trend, FormTrend::Improving);
        assert_eq!(summary.performance_level, PerformanceLevel::Good);
        assert_eq!(summary.primary_exercise, ExerciseLabel::Squat);
        assert!((summary.rep_rate - 2.0).abs() < 1e-9);

        let messages = coach.workout_summary(120.0);
        assert_eq!(
            messages[0],
            "Great workout! You completed 4 reps with good form. \
             Your form improved during the session - excellent progress!"
        );
        assert_eq!(
            messages[1],
            "Solid session! Focus on consistency for continued improvement."
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut coach = coach();
        for i in 0..20 {
            coach.update(&input(i as f64, 30, i));
        }
        let greeting = coach.reset(100.0);
        assert_eq!(greeting, NEW_SESSION_MESSAGE);
        assert!(!coach.is_fatigued());
        assert!(!coach.is_resting());
        assert!(coach.summary(100.0).is_none());
        assert_eq!(coach.mode(), CoachingMode::Encouragement);
    }

    proptest! {
        #[test]
        fn update_never_panics(
            frames in prop::collection::vec((0u32..=100, 0u32..5), 0..120)
        ) {
            let mut coach = coach();
            let mut reps = 0;
            for (i, (score, inc)) in frames.into_iter().enumerate() {
                reps += inc;
                let _ = coach.update(&input(i as f64 * 0.5, score, reps));
            }
            if let Some(summary) = coach.summary(1000.0) {
                prop_assert!((0.0..=100.0).contains(&summary.average_form_score));
            }
        }
    }
}
