//! Rule-based form quality scoring.
//!
//! Each exercise has an ordered table of independent rules. A rule that
//! fires subtracts its penalty from 100 and contributes one issue and one
//! recommendation. A universal visibility rule runs after the exercise
//! rules for every label, plank and unknown included.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use formcoach_pose_model::ExerciseLabel;
use serde::{Deserialize, Serialize};

use crate::features::{AngleKind, Feature, FeatureVector};

/// Score of a frame with no findings.
pub const PERFECT_SCORE: u32 = 100;

/// Outcome of scoring one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnalysisResult {
    /// Form score in [0, 100].
    pub score: u32,
    /// Issues in rule evaluation order.
    pub issues: Vec<String>,
    /// Recommendations, parallel to `issues`.
    pub recommendations: Vec<String>,
}

impl FormAnalysisResult {
    pub fn perfect() -> Self {
        Self {
            score: PERFECT_SCORE,
            issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

/// Predicate over feature values.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Below(Feature, f64),
    Above(Feature, f64),
    /// Fires when any of the features exceeds the limit.
    AnyAbove(Vec<Feature>, f64),
}

impl Condition {
    pub fn holds(&self, features: &FeatureVector) -> bool {
        match self {
            Condition::Below(feature, limit) => features.value(*feature) < *limit,
            Condition::Above(feature, limit) => features.value(*feature) > *limit,
            Condition::AnyAbove(list, limit) => list.iter().any(|f| features.value(*f) > *limit),
        }
    }
}

/// One row of a rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRule {
    pub condition: Condition,
    pub penalty: u32,
    pub issue: String,
    pub recommendation: String,
}

impl FormRule {
    pub fn new(condition: Condition, penalty: u32, issue: &str, recommendation: &str) -> Self {
        Self {
            condition,
            penalty,
            issue: issue.to_string(),
            recommendation: recommendation.to_string(),
        }
    }
}

/// Rule tables per exercise plus the rules applied to every exercise.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    per_exercise: BTreeMap<ExerciseLabel, Vec<FormRule>>,
    universal: Vec<FormRule>,
}

impl RuleSet {
    /// An empty rule set: every frame scores 100.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard coaching rules.
    pub fn standard() -> Self {
        use Condition::*;
        use Feature::*;

        let squat = vec![
            FormRule::new(
                Below(AvgKnee, 60.0),
                20,
                "Squatting too deep - risk of knee injury",
                "Don't go below parallel (90 degrees)",
            ),
            FormRule::new(
                Above(AvgKnee, 140.0),
                15,
                "Not squatting deep enough",
                "Go deeper until thighs are parallel",
            ),
            FormRule::new(
                Below(AvgHip, 60.0),
                20,
                "Hips not hinging properly",
                "Push hips back more, imagine sitting in a chair",
            ),
            FormRule::new(
                Above(TorsoLean, 30.0),
                15,
                "Leaning forward too much",
                "Keep chest up and core engaged",
            ),
            FormRule::new(
                Above(KneeSymmetry, 15.0),
                10,
                "Uneven knee positioning",
                "Focus on balanced movement",
            ),
            FormRule::new(
                Below(FootDistance, 40.0),
                10,
                "Stance too narrow",
                "Widen stance to shoulder width",
            ),
            FormRule::new(
                Above(Velocity(AngleKind::RightKnee), 100.0),
                10,
                "Moving too quickly",
                "Slow down for better control",
            ),
        ];

        let bicep_curl = vec![
            FormRule::new(
                AnyAbove(
                    vec![Angle(AngleKind::RightElbow), Angle(AngleKind::LeftElbow)],
                    170.0,
                ),
                10,
                "Elbow overextending",
                "Don't fully lock out elbows",
            ),
            FormRule::new(
                Above(Velocity(AngleKind::RightElbow), 150.0),
                20,
                "Using momentum - swinging weights",
                "Use controlled movements",
            ),
            FormRule::new(
                Above(TorsoLean, 15.0),
                10,
                "Leaning too much",
                "Stand straight, engage core",
            ),
        ];

        let push_up = vec![
            FormRule::new(
                Above(AvgElbow, 160.0),
                15,
                "Not going down far enough",
                "Lower until chest nearly touches ground",
            ),
            FormRule::new(
                Below(Spine, 160.0),
                20,
                "Hips sagging or piking",
                "Maintain straight line from head to heels",
            ),
        ];

        Self::empty()
            .with_rules(ExerciseLabel::Squat, squat)
            .with_rules(ExerciseLabel::BicepCurl, bicep_curl)
            .with_rules(ExerciseLabel::PushUp, push_up)
            .with_universal(FormRule::new(
                Below(MinVisibility, 0.7),
                5,
                "Poor camera angle or lighting",
                "Improve camera position and lighting",
            ))
    }

    /// Replace the rule table of one exercise.
    pub fn with_rules(mut self, exercise: ExerciseLabel, rules: Vec<FormRule>) -> Self {
        self.per_exercise.insert(exercise, rules);
        self
    }

    /// Append a rule evaluated for every exercise.
    pub fn with_universal(mut self, rule: FormRule) -> Self {
        self.universal.push(rule);
        self
    }

    /// Rules evaluated for `exercise`, in order.
    pub fn rules_for(&self, exercise: ExerciseLabel) -> impl Iterator<Item = &FormRule> {
        self.per_exercise
            .get(&exercise)
            .into_iter()
            .flatten()
            .chain(self.universal.iter())
    }
}

/// Pure scorer over a fixed rule set.
#[derive(Debug, Clone)]
pub struct FormScorer {
    rules: RuleSet,
}

impl FormScorer {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn score(&self, exercise: ExerciseLabel, features: &FeatureVector) -> FormAnalysisResult {
        let mut penalty: u32 = 0;
        let mut result = FormAnalysisResult::perfect();

        for rule in self.rules.rules_for(exercise) {
            if rule.condition.holds(features) {
                penalty = penalty.saturating_add(rule.penalty);
                result.issues.push(rule.issue.clone());
                result.recommendations.push(rule.recommendation.clone());
            }
        }

        result.score = PERFECT_SCORE.saturating_sub(penalty);
        result
    }
}

impl Default for FormScorer {
    fn default() -> Self {
        Self::new(RuleSet::standard())
    }
}

/// Score a frame against the standard rules.
pub fn score(exercise: ExerciseLabel, features: &FeatureVector) -> FormAnalysisResult {
    static STANDARD: OnceLock<FormScorer> = OnceLock::new();
    STANDARD.get_or_init(FormScorer::default).score(exercise, features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::JointAngles;
    use proptest::prelude::*;

    fn features(knee: f64, elbow: f64) -> FeatureVector {
        FeatureVector {
            angles: JointAngles {
                right_knee: knee,
                left_knee: knee,
                right_hip: knee,
                left_hip: knee,
                right_elbow: elbow,
                left_elbow: elbow,
            },
            spine_angle: 175.0,
            knee_symmetry: 0.0,
            hip_symmetry: 0.0,
            shoulder_symmetry: 0.0,
            foot_distance: 120.0,
            torso_lean: 0.0,
            shoulder_hip_distance: 150.0,
            avg_visibility: 0.95,
            min_visibility: 0.95,
            velocities: None,
        }
    }

    #[test]
    fn test_good_squat_is_perfect() {
        let result = score(ExerciseLabel::Squat, &features(95.0, 170.0));
        assert_eq!(result, FormAnalysisResult::perfect());
    }

    #[test]
    fn test_shallow_squat() {
        let result = score(ExerciseLabel::Squat, &features(150.0, 170.0));
        assert_eq!(result.score, 85);
        assert_eq!(result.issues, vec!["Not squatting deep enough"]);
        assert_eq!(
            result.recommendations,
            vec!["Go deeper until thighs are parallel"]
        );
    }

    #[test]
    fn test_rules_accumulate_in_order() {
        let mut f = features(50.0, 170.0);
        f.foot_distance = 10.0;
        f.min_visibility = 0.5;
        let result = score(ExerciseLabel::Squat, &f);
        assert_eq!(result.score, 100 - 20 - 20 - 10 - 5);
        assert_eq!(
            result.issues,
            vec![
                "Squatting too deep - risk of knee injury",
                "Hips not hinging properly",
                "Stance too narrow",
                "Poor camera angle or lighting",
            ]
        );
    }

    #[test]
    fn test_squat_speed_uses_right_knee_velocity() {
        let mut f = features(95.0, 170.0);
        f.velocities = Some([150.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let result = score(ExerciseLabel::Squat, &f);
        assert_eq!(result.score, 90);
        assert_eq!(result.issues, vec!["Moving too quickly"]);
    }

    #[test]
    fn test_curl_lockout_on_either_arm() {
        let mut f = features(180.0, 60.0);
        f.angles.left_elbow = 175.0;
        let result = score(ExerciseLabel::BicepCurl, &f);
        assert_eq!(result.score, 90);
        assert_eq!(result.issues, vec!["Elbow overextending"]);
    }

    #[test]
    fn test_curl_swing_and_lean() {
        let mut f = features(180.0, 60.0);
        f.velocities = Some([0.0, 0.0, 0.0, 0.0, 200.0, 0.0]);
        f.torso_lean = 20.0;
        let result = score(ExerciseLabel::BicepCurl, &f);
        assert_eq!(result.score, 70);
        assert_eq!(
            result.issues,
            vec!["Using momentum - swinging weights", "Leaning too much"]
        );
    }

    #[test]
    fn test_push_up_rules() {
        let mut f = features(180.0, 170.0);
        f.spine_angle = 150.0;
        let result = score(ExerciseLabel::PushUp, &f);
        assert_eq!(result.score, 65);
        assert_eq!(
            result.issues,
            vec!["Not going down far enough", "Hips sagging or piking"]
        );
    }

    #[test]
    fn test_plank_only_checks_visibility() {
        let mut f = features(10.0, 10.0);
        f.foot_distance = 0.0;
        f.spine_angle = 90.0;
        assert_eq!(score(ExerciseLabel::Plank, &f).score, 100);
        f.min_visibility = 0.2;
        let result = score(ExerciseLabel::Plank, &f);
        assert_eq!(result.score, 95);
        assert_eq!(result.issues, vec!["Poor camera angle or lighting"]);
        assert_eq!(score(ExerciseLabel::Unknown, &f).score, 95);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let heavy = |issue: &str| {
            FormRule::new(Condition::Below(Feature::AvgKnee, 1000.0), 40, issue, "fix it")
        };
        let scorer = FormScorer::new(
            RuleSet::empty().with_rules(
                ExerciseLabel::Squat,
                vec![heavy("a"), heavy("b"), heavy("c")],
            ),
        );
        let result = scorer.score(ExerciseLabel::Squat, &features(90.0, 90.0));
        assert_eq!(result.score, 0);
        assert_eq!(result.issues.len(), 3);
    }

    #[test]
    fn test_worst_standard_squat() {
        let mut f = features(30.0, 170.0);
        f.torso_lean = 50.0;
        f.knee_symmetry = 40.0;
        f.foot_distance = 5.0;
        f.min_visibility = 0.1;
        f.velocities = Some([500.0; 6]);
        let result = score(ExerciseLabel::Squat, &f);
        assert_eq!(result.score, 10);
        assert_eq!(result.issues.len(), 7);
    }

    proptest! {
        #[test]
        fn score_stays_in_range(
            knee in 0.0f64..180.0,
            elbow in 0.0f64..180.0,
            spine in 0.0f64..180.0,
            lean in 0.0f64..200.0,
            vis in 0.0f64..1.0,
            velocity in 0.0f64..3000.0,
            label in 0usize..5,
        ) {
            let mut f = features(knee, elbow);
            f.spine_angle = spine;
            f.torso_lean = lean;
            f.min_visibility = vis;
            f.velocities = Some([velocity; 6]);
            let result = score(ExerciseLabel::ALL[label], &f);
            prop_assert!(result.score <= 100);
            prop_assert_eq!(result.issues.len(), result.recommendations.len());
        }
    }
}
