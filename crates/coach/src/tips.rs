//! Exercise coaching knowledge.

use formcoach_pose_model::ExerciseLabel;

/// Form tips for an exercise, or general tips for anything else.
pub fn form_tips(exercise: ExerciseLabel) -> &'static [&'static str] {
    match exercise {
        ExerciseLabel::Squat => &[
            "Keep your chest up and core engaged",
            "Push through your heels",
            "Don't let knees cave inward",
            "Sit back like you're sitting in a chair",
            "Keep your weight centered",
        ],
        ExerciseLabel::BicepCurl => &[
            "Keep elbows at your sides",
            "Control the negative portion",
            "Don't swing the weights",
            "Focus on the bicep contraction",
            "Keep your core tight",
        ],
        ExerciseLabel::PushUp => &[
            "Keep body in straight line",
            "Lower chest to ground",
            "Push through your palms",
            "Keep core engaged",
            "Don't let hips sag",
        ],
        ExerciseLabel::Plank | ExerciseLabel::Unknown => GENERAL_TIPS,
    }
}

/// Whether [`form_tips`] returns exercise-specific tips.
pub fn has_specific_tips(exercise: ExerciseLabel) -> bool {
    matches!(
        exercise,
        ExerciseLabel::Squat | ExerciseLabel::BicepCurl | ExerciseLabel::PushUp
    )
}

pub const GENERAL_TIPS: &[&str] = &[
    "Focus on controlled movements",
    "Quality over quantity always",
    "Breathe properly during each rep",
    "Engage your core throughout",
    "Listen to your body",
];

/// Praise for an exercise.
pub fn encouragement(exercise: ExerciseLabel) -> &'static [&'static str] {
    match exercise {
        ExerciseLabel::Squat => &[
            "Strong squats! Keep it up!",
            "Great depth on that one!",
            "Perfect form - you're crushing it!",
            "Feel those glutes working!",
        ],
        ExerciseLabel::BicepCurl => &[
            "Nice controlled movement!",
            "Feel that bicep burn!",
            "Excellent form on those curls!",
            "Keep that control!",
        ],
        ExerciseLabel::PushUp => &[
            "Strong push-ups!",
            "Perfect plank position!",
            "You're getting stronger!",
            "Great upper body work!",
        ],
        ExerciseLabel::Plank | ExerciseLabel::Unknown => &[
            "Excellent form! Keep it up!",
            "You're crushing it!",
            "Perfect technique!",
            "That's how it's done!",
            "Strong work!",
        ],
    }
}

pub const IMPROVEMENT: &[&str] = &[
    "Good effort! Let's fine-tune that form.",
    "You're on the right track. Small adjustments needed.",
    "Almost there! Focus on the details.",
];

/// Specific advice for the first issue reported for a frame.
///
/// Matching is by keyword against the issue text, first match wins.
pub fn issue_advice(exercise: ExerciseLabel, issue: &str) -> Option<&'static str> {
    let table: &[(&str, &str)] = match exercise {
        ExerciseLabel::Squat => &[
            ("deep", "Focus on proper depth - thighs parallel to ground"),
            ("leaning", "Keep chest up, don't lean forward"),
            ("knee positioning", "Keep knees aligned with toes"),
            ("stance", "Adjust stance to shoulder width"),
        ],
        ExerciseLabel::BicepCurl => &[
            ("elbow", "Control the range of motion"),
            ("leaning", "Stand straight, no leaning"),
            ("momentum", "Slow down - control the weight"),
        ],
        ExerciseLabel::PushUp => &[
            ("hips", "Keep that plank position strong"),
            ("far enough", "Go deeper - chest to ground"),
        ],
        ExerciseLabel::Plank | ExerciseLabel::Unknown => &[],
    };

    let issue = issue.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| issue.contains(keyword))
        .map(|(_, advice)| *advice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_matches_scorer_issue_text() {
        assert_eq!(
            issue_advice(ExerciseLabel::Squat, "Not squatting deep enough"),
            Some("Focus on proper depth - thighs parallel to ground")
        );
        assert_eq!(
            issue_advice(ExerciseLabel::BicepCurl, "Using momentum - swinging weights"),
            Some("Slow down - control the weight")
        );
        assert_eq!(
            issue_advice(ExerciseLabel::PushUp, "Hips sagging or piking"),
            Some("Keep that plank position strong")
        );
        assert_eq!(
            issue_advice(ExerciseLabel::Squat, "Poor camera angle or lighting"),
            None
        );
        assert_eq!(issue_advice(ExerciseLabel::Plank, "anything"), None);
    }

    #[test]
    fn test_every_exercise_has_tips_and_praise() {
        for exercise in ExerciseLabel::ALL {
            assert!(!form_tips(exercise).is_empty());
            assert!(!encouragement(exercise).is_empty());
        }
        assert!(!has_specific_tips(ExerciseLabel::Plank));
    }
}
