//! Whole-run aggregation and the batch analyzer.

use formcoach_common::{AnalysisDefaults, FormcoachError, FormcoachResult};
use formcoach_pose_model::{
    ExerciseLabel, FrameSource, KeyFrame, PoseSample, SessionReport, StreamHeader,
    VecFrameSource,
};

use crate::classifier::classify;
use crate::features::FeatureExtractor;
use crate::form::{FormAnalysisResult, FormScorer};
use crate::reps::estimate_reps;

/// Accumulates per-frame outcomes over one analysis run.
///
/// Votes, issues and recommendations keep first-seen order so that
/// reports are reproducible and vote ties resolve to the earliest label.
#[derive(Debug, Clone)]
pub struct SessionAggregate {
    settings: AnalysisDefaults,
    frames_analyzed: u64,
    votes: Vec<(ExerciseLabel, u64)>,
    form_scores: Vec<u32>,
    issues: Vec<String>,
    recommendations: Vec<String>,
    key_frames: Vec<KeyFrame>,
}

impl SessionAggregate {
    pub fn new(settings: AnalysisDefaults) -> Self {
        Self {
            settings,
            frames_analyzed: 0,
            votes: Vec::new(),
            form_scores: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            key_frames: Vec::new(),
        }
    }

    /// Record one analyzed frame.
    pub fn record(&mut self, frame: u64, label: ExerciseLabel, form: &FormAnalysisResult) {
        self.frames_analyzed += 1;

        match self.votes.iter_mut().find(|(l, _)| *l == label) {
            Some((_, n)) => *n += 1,
            None => self.votes.push((label, 1)),
        }

        self.form_scores.push(form.score);
        push_unique(&mut self.issues, &form.issues);
        push_unique(&mut self.recommendations, &form.recommendations);

        if form.score < self.settings.key_frame_score_floor {
            self.key_frames.push(KeyFrame {
                frame,
                score: form.score,
                issues: form
                    .issues
                    .iter()
                    .take(self.settings.key_frame_issue_limit)
                    .cloned()
                    .collect(),
            });
        }
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Vote tally in first-seen order.
    pub fn votes(&self) -> &[(ExerciseLabel, u64)] {
        &self.votes
    }

    pub fn form_scores(&self) -> &[u32] {
        &self.form_scores
    }

    /// Dominant label and its vote share; ties go to the earliest label.
    pub fn dominant(&self) -> Option<(ExerciseLabel, f64)> {
        let total: u64 = self.votes.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return None;
        }
        let mut best = self.votes[0];
        for &(label, n) in &self.votes[1..] {
            if n > best.1 {
                best = (label, n);
            }
        }
        Some((best.0, best.1 as f64 / total as f64))
    }

    /// Close the run and build the report.
    ///
    /// Fails with [`FormcoachError::NoPoseDetected`] when no frame was recorded.
    pub fn finalize(self, video_duration: f64, fps: f64) -> FormcoachResult<SessionReport> {
        let (exercise, confidence) = self.dominant().ok_or(FormcoachError::NoPoseDetected)?;

        let overall_score = if self.form_scores.is_empty() {
            0
        } else {
            let sum: u64 = self.form_scores.iter().map(|&s| u64::from(s)).sum();
            (sum / self.form_scores.len() as u64) as u32
        };

        let rep_count = estimate_reps(&self.form_scores, self.settings.min_scores_for_rep_estimate);

        Ok(SessionReport {
            exercise_detected: exercise,
            confidence,
            overall_score,
            rep_count,
            issues_detected: self.issues,
            recommendations: self.recommendations,
            frames_analyzed: self.frames_analyzed,
            form_scores: self.form_scores,
            key_frames: self.key_frames,
            video_duration,
            fps,
        })
    }
}

impl Default for SessionAggregate {
    fn default() -> Self {
        Self::new(AnalysisDefaults::default())
    }
}

fn push_unique(into: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

/// Single pass over a pose stream producing a [`SessionReport`].
///
/// Every `frame_stride`-th frame is extracted, classified by raw vote
/// and scored. Frames without a usable pose are skipped. Unparsable
/// stream lines are logged and skipped; I/O failures end the run.
#[derive(Debug, Clone, Default)]
pub struct BatchAnalyzer {
    settings: AnalysisDefaults,
    scorer: FormScorer,
}

impl BatchAnalyzer {
    pub fn new(settings: AnalysisDefaults) -> Self {
        Self {
            settings,
            scorer: FormScorer::default(),
        }
    }

    pub fn with_scorer(mut self, scorer: FormScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn settings(&self) -> &AnalysisDefaults {
        &self.settings
    }

    /// Analyze in-memory samples.
    pub fn analyze_samples(
        &self,
        header: StreamHeader,
        samples: Vec<PoseSample>,
    ) -> FormcoachResult<SessionReport> {
        self.analyze(&mut VecFrameSource::new(header, samples))
    }

    /// Analyze everything a frame source yields.
    pub fn analyze<S: FrameSource + ?Sized>(&self, source: &mut S) -> FormcoachResult<SessionReport> {
        let header = source.header().clone();
        let stride = self.settings.frame_stride.max(1) as u64;

        let mut extractor = FeatureExtractor::new(header.dims());
        let mut aggregate = SessionAggregate::new(self.settings.clone());
        let mut frames_seen: u64 = 0;
        let mut decoded: u64 = 0;
        let mut skipped: u64 = 0;

        tracing::info!(
            width = header.width,
            height = header.height,
            fps = header.fps,
            stride,
            "Starting batch analysis"
        );

        loop {
            // Stride follows read order, so gaps in recorded frame numbers
            // do not skew sampling.
            let index = decoded;
            let sample = match source.next_frame() {
                Ok(Some(sample)) => sample,
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    decoded += 1;
                    tracing::warn!(error = %e, "Skipping unreadable pose record");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            decoded += 1;
            frames_seen = frames_seen.max(sample.frame.saturating_add(1)).max(decoded);

            if index % stride != 0 {
                continue;
            }

            let features = match extractor.extract(sample.landmarks.as_ref()) {
                Ok(features) => features,
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(frame = sample.frame, error = %e, "Frame skipped");
                    continue;
                }
            };

            let label = classify(&features);
            let form = self.scorer.score(label, &features);
            tracing::debug!(
                frame = sample.frame,
                exercise = %label,
                score = form.score,
                "Frame analyzed"
            );
            aggregate.record(sample.frame, label, &form);
        }

        let total_frames = header.total_frames.unwrap_or(frames_seen);
        let video_duration = if header.fps > 0.0 {
            total_frames as f64 / header.fps
        } else {
            0.0
        };

        tracing::info!(
            analyzed = aggregate.frames_analyzed(),
            skipped,
            total_frames,
            "Batch analysis finished"
        );

        aggregate.finalize(video_duration, header.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(score: u32, issues: &[&str]) -> FormAnalysisResult {
        FormAnalysisResult {
            score,
            issues: issues.iter().map(|s| s.to_string()).collect(),
            recommendations: issues.iter().map(|s| format!("fix {s}")).collect(),
        }
    }

    #[test]
    fn test_empty_session_is_no_pose() {
        let err = SessionAggregate::default().finalize(10.0, 30.0).unwrap_err();
        assert!(matches!(err, FormcoachError::NoPoseDetected));
    }

    #[test]
    fn test_vote_tie_goes_to_first_label() {
        let mut agg = SessionAggregate::default();
        agg.record(0, ExerciseLabel::Plank, &form(100, &[]));
        agg.record(3, ExerciseLabel::Squat, &form(100, &[]));
        agg.record(6, ExerciseLabel::Squat, &form(100, &[]));
        agg.record(9, ExerciseLabel::Plank, &form(100, &[]));
        assert_eq!(agg.dominant(), Some((ExerciseLabel::Plank, 0.5)));
    }

    #[test]
    fn test_issues_deduplicate_in_first_seen_order() {
        let mut agg = SessionAggregate::default();
        agg.record(0, ExerciseLabel::Squat, &form(85, &["b", "a"]));
        agg.record(3, ExerciseLabel::Squat, &form(85, &["a", "c", "b"]));
        let report = agg.finalize(1.0, 30.0).unwrap();
        assert_eq!(report.issues_detected, vec!["b", "a", "c"]);
        assert_eq!(report.recommendations, vec!["fix b", "fix a", "fix c"]);
    }

    #[test]
    fn test_key_frames_keep_top_two_issues() {
        let mut agg = SessionAggregate::default();
        agg.record(0, ExerciseLabel::Squat, &form(70, &["x"]));
        agg.record(3, ExerciseLabel::Squat, &form(45, &["x", "y", "z"]));
        let report = agg.finalize(1.0, 30.0).unwrap();
        assert_eq!(report.key_frames.len(), 1);
        assert_eq!(report.key_frames[0].frame, 3);
        assert_eq!(report.key_frames[0].issues, vec!["x", "y"]);
    }

    #[test]
    fn test_overall_score_truncates() {
        let mut agg = SessionAggregate::default();
        agg.record(0, ExerciseLabel::Squat, &form(90, &[]));
        agg.record(3, ExerciseLabel::Squat, &form(85, &[]));
        let report = agg.finalize(1.0, 30.0).unwrap();
        assert_eq!(report.overall_score, 87);
        assert_eq!(report.rep_count, 0);
    }

    #[test]
    fn test_stride_and_missing_landmarks() {
        let header = StreamHeader::new(640, 480, 30.0);
        let samples = (0..9).map(|i| PoseSample::new(i, None)).collect();
        let err = BatchAnalyzer::default()
            .analyze_samples(header, samples)
            .unwrap_err();
        assert!(matches!(err, FormcoachError::NoPoseDetected));
    }
}
