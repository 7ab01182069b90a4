//! Live analysis session.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use formcoach_analysis_core::classifier::ExerciseSmoother;
use formcoach_analysis_core::reps::{rep_message, RepEvent};
use formcoach_analysis_core::{classify, FeatureExtractor, FormAnalysisResult, FormScorer, RepCounter};
use formcoach_coach::{Coach, CoachInput, PerformanceSummary, VoiceWorker};
use formcoach_common::{
    AppConfig, ClassificationDefaults, FormcoachResult, FpsMeter, IntervalGate, SessionClock,
};
use formcoach_pose_model::{ExerciseLabel, FrameDims, FrameSource, PoseSample};
use serde::Serialize;

/// Frames used for the rolling FPS estimate.
pub const FPS_WINDOW: usize = 30;

/// Where frame timestamps come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    /// Frame index divided by the stream's nominal rate. Deterministic for replays.
    Stream,
    /// Monotonic time since the session started.
    Wall,
}

/// Configuration for a live session.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub classification: ClassificationDefaults,

    /// Minimum seconds between coach updates.
    pub feedback_interval_secs: f64,

    /// Frame source errors tolerated in a row before the session stops.
    pub max_consecutive_errors: u32,

    /// Recent form scores kept for the running average.
    pub form_history: usize,

    pub time_base: TimeBase,
}

impl LiveSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            classification: config.classification.clone(),
            feedback_interval_secs: config.coaching.feedback_interval_secs,
            max_consecutive_errors: config.live.max_consecutive_errors,
            form_history: config.live.form_history,
            time_base: TimeBase::Stream,
        }
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Why [`LiveSession::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfStream,
    Requested,
    TooManyErrors,
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub frame: u64,
    /// Smoothed exercise label after this frame.
    pub exercise: ExerciseLabel,
    pub confidence: f64,
    /// `None` when the frame had no usable pose.
    pub form: Option<FormAnalysisResult>,
    pub rep: Option<RepEvent>,
    pub coaching: Option<String>,
}

/// Session statistics at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSummary {
    /// Wall-clock start of the session (RFC 3339).
    pub started_at: String,
    pub frames_seen: u64,
    pub frames_with_pose: u64,
    pub exercise: ExerciseLabel,
    pub confidence: f64,
    pub reps: BTreeMap<ExerciseLabel, u32>,
    pub total_reps: u32,
    /// Mean of the recent form history, 0 if empty.
    pub average_form_score: f64,
    pub fps: f64,
    pub dropped_messages: u64,
    pub stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coaching: Option<PerformanceSummary>,
}

/// A live analysis session.
///
/// Owns every piece of per-session state: feature history, label
/// smoothing, rep counters, form history, coach, and the voice worker.
pub struct LiveSession {
    settings: LiveSettings,
    extractor: FeatureExtractor,
    smoother: ExerciseSmoother,
    reps: RepCounter,
    scorer: FormScorer,
    form_history: VecDeque<u32>,
    fps: FpsMeter,
    feedback: IntervalGate,
    coach: Option<Coach>,
    voice: Option<VoiceWorker>,
    clock: SessionClock,
    stop_flag: Arc<AtomicBool>,
    stream_fps: f64,
    last_now: f64,
    frames_seen: u64,
    frames_with_pose: u64,
    consecutive_errors: u32,
}

impl LiveSession {
    /// Create a session for frames of the given pixel dimensions.
    pub fn new(settings: LiveSettings, dims: FrameDims) -> Self {
        Self {
            extractor: FeatureExtractor::new(dims),
            smoother: ExerciseSmoother::from_config(&settings.classification),
            reps: RepCounter::new(),
            scorer: FormScorer::default(),
            form_history: VecDeque::with_capacity(settings.form_history),
            fps: FpsMeter::new(FPS_WINDOW),
            feedback: IntervalGate::new(settings.feedback_interval_secs),
            coach: None,
            voice: None,
            clock: SessionClock::start(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            stream_fps: 0.0,
            last_now: 0.0,
            frames_seen: 0,
            frames_with_pose: 0,
            consecutive_errors: 0,
            settings,
        }
    }

    /// Enable coaching feedback.
    pub fn with_coach(mut self, coach: Coach) -> Self {
        self.coach = Some(coach);
        self
    }

    /// Send rep announcements and coaching to this worker.
    pub fn with_voice(mut self, voice: VoiceWorker) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_scorer(mut self, scorer: FormScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    /// Flag checked before each frame. Setting it ends [`LiveSession::run`].
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    pub fn current_exercise(&self) -> ExerciseLabel {
        self.smoother.current()
    }

    pub fn reps(&self, exercise: ExerciseLabel) -> u32 {
        self.reps.reps(exercise)
    }

    pub fn total_reps(&self) -> u32 {
        self.reps.total()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn average_form_score(&self) -> f64 {
        if self.form_history.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.form_history.iter().map(|&s| u64::from(s)).sum();
        sum as f64 / self.form_history.len() as f64
    }

    pub fn coach(&self) -> Option<&Coach> {
        self.coach.as_ref()
    }

    /// Analyze one frame at `now_secs` on the session time base.
    ///
    /// Frames without a usable pose are counted and timed but do not
    /// touch the analysis state.
    pub fn process(&mut self, sample: &PoseSample, now_secs: f64) -> FrameOutcome {
        self.frames_seen += 1;
        self.last_now = now_secs;
        self.fps.tick(now_secs);

        let features = match self.extractor.extract(sample.landmarks.as_ref()) {
            Ok(features) => features,
            Err(e) => {
                tracing::debug!(frame = sample.frame, error = %e, "Skipping frame");
                return FrameOutcome {
                    frame: sample.frame,
                    exercise: self.smoother.current(),
                    confidence: self.smoother.confidence(),
                    form: None,
                    rep: None,
                    coaching: None,
                };
            }
        };
        self.frames_with_pose += 1;

        let label = self.smoother.push(classify(&features));
        if label.changed {
            tracing::info!(
                frame = sample.frame,
                exercise = %label.exercise,
                confidence = label.confidence,
                "Exercise changed"
            );
        }
        let exercise = label.exercise;

        let form = self.scorer.score(exercise, &features);
        if self.form_history.len() >= self.settings.form_history.max(1) {
            self.form_history.pop_front();
        }
        self.form_history.push_back(form.score);

        // Announcements count reps across the whole session.
        let rep = self.reps.update(exercise, &features);
        if let Some(message) = rep.and_then(|e| rep_message(e.exercise, e.total_reps)) {
            self.announce(&message);
        }

        let mut coaching = None;
        if let Some(coach) = self.coach.as_mut() {
            if self.feedback.should_fire(now_secs) {
                coaching = coach.update(&CoachInput {
                    now_secs,
                    form_score: form.score,
                    rep_count: self.reps.total(),
                    exercise,
                    issues: &form.issues,
                    recommendations: &form.recommendations,
                });
            }
        }
        if let Some(message) = &coaching {
            self.announce(message);
        }

        FrameOutcome {
            frame: sample.frame,
            exercise,
            confidence: label.confidence,
            form: Some(form),
            rep,
            coaching,
        }
    }

    /// Process frames until the source ends, a stop is requested, or the
    /// source fails too many times in a row.
    ///
    /// Unrecoverable source errors are returned to the caller.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> FormcoachResult<LiveSummary> {
        self.stream_fps = source.header().fps;
        tracing::info!(
            fps = self.stream_fps,
            time_base = ?self.settings.time_base,
            coaching = self.coach.is_some(),
            "Starting live session"
        );

        let reason = loop {
            if self.is_stop_requested() {
                break StopReason::Requested;
            }
            match source.next_frame() {
                Ok(Some(sample)) => {
                    self.consecutive_errors = 0;
                    let now = self.now_secs(sample.frame);
                    self.process(&sample, now);
                }
                Ok(None) => break StopReason::EndOfStream,
                Err(e) if e.is_recoverable() => {
                    self.consecutive_errors += 1;
                    tracing::warn!(
                        error = %e,
                        consecutive = self.consecutive_errors,
                        "Frame source error"
                    );
                    if self.consecutive_errors > self.settings.max_consecutive_errors {
                        tracing::error!(
                            limit = self.settings.max_consecutive_errors,
                            "Too many consecutive frame errors, stopping"
                        );
                        break StopReason::TooManyErrors;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        };

        let closing = self
            .coach
            .as_ref()
            .map(|coach| coach.workout_summary(self.last_now))
            .unwrap_or_default();
        for line in &closing {
            self.announce(line);
        }

        let summary = self.summary(reason);
        tracing::info!(
            frames = summary.frames_seen,
            with_pose = summary.frames_with_pose,
            exercise = %summary.exercise,
            total_reps = summary.total_reps,
            stop_reason = ?summary.stop_reason,
            "Live session finished"
        );
        Ok(summary)
    }

    /// Snapshot of the session.
    pub fn summary(&self, stop_reason: StopReason) -> LiveSummary {
        let reps = ExerciseLabel::ALL
            .iter()
            .map(|&ex| (ex, self.reps.reps(ex)))
            .filter(|&(_, n)| n > 0)
            .collect();
        LiveSummary {
            started_at: self.clock.epoch_wall().to_string(),
            frames_seen: self.frames_seen,
            frames_with_pose: self.frames_with_pose,
            exercise: self.smoother.current(),
            confidence: self.smoother.confidence(),
            reps,
            total_reps: self.reps.total(),
            average_form_score: self.average_form_score(),
            fps: self.fps.fps(),
            dropped_messages: self.voice.as_ref().map_or(0, VoiceWorker::dropped),
            stop_reason,
            coaching: self
                .coach
                .as_ref()
                .and_then(|coach| coach.summary(self.last_now)),
        }
    }

    /// Start over: every history, counter and the coach are cleared together.
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.smoother.reset();
        self.reps.reset();
        self.form_history.clear();
        self.fps.clear();
        self.feedback.reset();
        self.frames_seen = 0;
        self.frames_with_pose = 0;
        self.consecutive_errors = 0;
        self.stop_flag.store(false, Ordering::SeqCst);
        self.clock = SessionClock::start();
        if self.settings.time_base == TimeBase::Wall {
            self.last_now = 0.0;
        }

        tracing::info!("Live session reset");
        let now = self.last_now;
        if let Some(greeting) = self.coach.as_mut().map(|coach| coach.reset(now)) {
            self.announce(&greeting);
        }
    }

    /// Announce a form tip for the current exercise. `None` without a coach.
    pub fn tip(&mut self) -> Option<String> {
        let exercise = self.smoother.current();
        let tip = self.coach.as_mut()?.tip(Some(exercise));
        self.announce(&tip);
        Some(tip)
    }

    /// Stop the voice worker, flushing queued messages.
    ///
    /// Returns false if the worker had to be detached.
    pub fn shutdown(mut self) -> bool {
        self.request_stop();
        match self.voice.take() {
            Some(voice) => voice.shutdown(),
            None => true,
        }
    }

    fn now_secs(&self, frame: u64) -> f64 {
        match self.settings.time_base {
            TimeBase::Stream => SessionClock::frame_to_secs(frame, self.stream_fps),
            TimeBase::Wall => self.clock.elapsed_secs(),
        }
    }

    fn announce(&self, message: &str) {
        tracing::info!(target: "formcoach::coach", text = message, "Coaching");
        if let Some(voice) = &self.voice {
            voice.say(message);
        }
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("exercise", &self.smoother.current())
            .field("total_reps", &self.reps.total())
            .field("frames_seen", &self.frames_seen)
            .field("coaching", &self.coach.is_some())
            .finish()
    }
}
