//! Exercise labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of exercises the classifier can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseLabel {
    Squat,
    PushUp,
    BicepCurl,
    Plank,
    Unknown,
}

impl Default for ExerciseLabel {
    fn default() -> Self {
        ExerciseLabel::Unknown
    }
}

impl ExerciseLabel {
    pub const ALL: [ExerciseLabel; 5] = [
        ExerciseLabel::Squat,
        ExerciseLabel::PushUp,
        ExerciseLabel::BicepCurl,
        ExerciseLabel::Plank,
        ExerciseLabel::Unknown,
    ];

    /// Wire name (`squat`, `push_up`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseLabel::Squat => "squat",
            ExerciseLabel::PushUp => "push_up",
            ExerciseLabel::BicepCurl => "bicep_curl",
            ExerciseLabel::Plank => "plank",
            ExerciseLabel::Unknown => "unknown",
        }
    }

    /// Human-readable name for display and speech.
    pub fn display_name(self) -> &'static str {
        match self {
            ExerciseLabel::Squat => "Squat",
            ExerciseLabel::PushUp => "Push Up",
            ExerciseLabel::BicepCurl => "Bicep Curl",
            ExerciseLabel::Plank => "Plank",
            ExerciseLabel::Unknown => "Unknown",
        }
    }

    pub fn is_unknown(self) -> bool {
        self == ExerciseLabel::Unknown
    }
}

impl fmt::Display for ExerciseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "squat" => Ok(ExerciseLabel::Squat),
            "push_up" | "pushup" => Ok(ExerciseLabel::PushUp),
            "bicep_curl" | "curl" => Ok(ExerciseLabel::BicepCurl),
            "plank" => Ok(ExerciseLabel::Plank),
            "unknown" => Ok(ExerciseLabel::Unknown),
            _ => Err(format!("unknown exercise '{s}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        for label in ExerciseLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
            assert_eq!(label.to_string(), label.as_str());
        }
    }

    #[test]
    fn test_from_str_accepts_variants() {
        assert_eq!("push-up".parse::<ExerciseLabel>(), Ok(ExerciseLabel::PushUp));
        assert_eq!("Bicep Curl".parse::<ExerciseLabel>(), Ok(ExerciseLabel::BicepCurl));
        assert!("deadlift".parse::<ExerciseLabel>().is_err());
    }

    #[test]
    fn test_default_is_unknown() {
        assert!(ExerciseLabel::default().is_unknown());
    }
}
