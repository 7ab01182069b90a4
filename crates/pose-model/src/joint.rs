//! Joint and landmark types.
//!
//! A `JointFrame` always holds every tracked joint. Joints the pose
//! provider did not report carry [`Landmark::SENTINEL`] so that downstream
//! arithmetic never has to deal with absence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tracked anatomical landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Joint {
    /// Number of tracked joints.
    pub const COUNT: usize = 19;

    /// All tracked joints in storage order.
    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Nose,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    /// Storage index of this joint.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name of this joint.
    pub fn name(self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
            Joint::LeftHeel => "left_heel",
            Joint::RightHeel => "right_heel",
            Joint::LeftFootIndex => "left_foot_index",
            Joint::RightFootIndex => "right_foot_index",
        }
    }
}

/// A 2-D point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points.
    pub fn midpoint(a: &Point2, b: &Point2) -> Point2 {
        Point2 {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }
}

/// Pixel dimensions used to convert normalized landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameDims {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

fn full_visibility() -> f64 {
    1.0
}

/// Normalized landmark position with visibility confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized X coordinate [0.0, 1.0].
    pub x: f64,
    /// Normalized Y coordinate [0.0, 1.0].
    pub y: f64,
    /// Visibility confidence [0.0, 1.0]. Providers that omit it are trusted fully.
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

impl Landmark {
    /// Placeholder for a joint the provider did not report.
    pub const SENTINEL: Landmark = Landmark {
        x: 0.0,
        y: 0.0,
        visibility: 0.0,
    };

    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    /// Whether all components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.visibility.is_finite()
    }
}

/// One frame's complete joint set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Joint, Landmark>",
    into = "BTreeMap<Joint, Landmark>"
)]
pub struct JointFrame {
    landmarks: [Landmark; Joint::COUNT],
}

impl JointFrame {
    /// A frame in which every joint is the sentinel.
    pub fn empty() -> Self {
        Self {
            landmarks: [Landmark::SENTINEL; Joint::COUNT],
        }
    }

    /// Build a frame from the joints a provider reported.
    pub fn from_landmarks(reported: impl IntoIterator<Item = (Joint, Landmark)>) -> Self {
        let mut frame = Self::empty();
        for (joint, landmark) in reported {
            frame.landmarks[joint.index()] = landmark;
        }
        frame
    }

    /// Landmark for a joint (sentinel if unreported).
    pub fn get(&self, joint: Joint) -> Landmark {
        self.landmarks[joint.index()]
    }

    pub fn set(&mut self, joint: Joint, landmark: Landmark) {
        self.landmarks[joint.index()] = landmark;
    }

    /// Pixel position of a joint, truncated to the integer pixel grid.
    pub fn pixel(&self, joint: Joint, dims: FrameDims) -> Point2 {
        let lm = self.get(joint);
        Point2::new(
            (lm.x * f64::from(dims.width)).trunc(),
            (lm.y * f64::from(dims.height)).trunc(),
        )
    }

    /// Visibility of a joint.
    pub fn visibility(&self, joint: Joint) -> f64 {
        self.get(joint).visibility
    }

    /// Iterate joints with their landmarks in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, Landmark)> + '_ {
        Joint::ALL.iter().map(move |&j| (j, self.landmarks[j.index()]))
    }

    /// First joint whose landmark contains a non-finite value.
    pub fn first_malformed(&self) -> Option<Joint> {
        self.iter().find(|(_, lm)| !lm.is_finite()).map(|(j, _)| j)
    }

    /// Number of joints carrying the sentinel.
    pub fn missing_count(&self) -> usize {
        self.landmarks
            .iter()
            .filter(|lm| **lm == Landmark::SENTINEL)
            .count()
    }
}

impl Default for JointFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<BTreeMap<Joint, Landmark>> for JointFrame {
    fn from(map: BTreeMap<Joint, Landmark>) -> Self {
        Self::from_landmarks(map)
    }
}

impl From<JointFrame> for BTreeMap<Joint, Landmark> {
    fn from(frame: JointFrame) -> Self {
        frame.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_joint_indices_match_storage_order() {
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
    }

    #[test]
    fn test_joint_names_match_serde() {
        for joint in Joint::ALL {
            let json = serde_json::to_string(&joint).unwrap();
            assert_eq!(json, format!("\"{}\"", joint.name()));
        }
    }

    #[test]
    fn test_unreported_joints_are_sentinels() {
        let frame = JointFrame::from_landmarks([(Joint::Nose, Landmark::new(0.5, 0.1, 0.9))]);
        assert_eq!(frame.get(Joint::Nose).visibility, 0.9);
        assert_eq!(frame.get(Joint::LeftKnee), Landmark::SENTINEL);
        assert_eq!(frame.missing_count(), Joint::COUNT - 1);
    }

    #[test]
    fn test_visibility_defaults_to_one() {
        let frame: JointFrame =
            serde_json::from_str(r#"{"left_hip": {"x": 0.25, "y": 0.5}}"#).unwrap();
        assert_eq!(frame.visibility(Joint::LeftHip), 1.0);
        assert_eq!(frame.visibility(Joint::RightHip), 0.0);
    }

    #[test]
    fn test_pixel_truncates() {
        let frame = JointFrame::from_landmarks([(Joint::LeftKnee, Landmark::new(0.5009, 0.2499, 1.0))]);
        let p = frame.pixel(Joint::LeftKnee, FrameDims::new(640, 480));
        assert_eq!(p, Point2::new(320.0, 119.0));
    }

    #[test]
    fn test_malformed_detection() {
        let mut frame = JointFrame::empty();
        assert!(frame.first_malformed().is_none());
        frame.set(Joint::RightWrist, Landmark::new(f64::NAN, 0.1, 1.0));
        assert_eq!(frame.first_malformed(), Some(Joint::RightWrist));
    }

    #[test]
    fn test_midpoint() {
        let m = Point2::midpoint(&Point2::new(0.0, 2.0), &Point2::new(4.0, 6.0));
        assert_eq!(m, Point2::new(2.0, 4.0));
    }

    fn any_reported() -> impl Strategy<Value = Vec<(Joint, Landmark)>> {
        prop::collection::vec(
            (0usize..Joint::COUNT, 0.0f64..=1.0, 0.0f64..=1.0, 0.01f64..=1.0),
            0..Joint::COUNT,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(i, x, y, v)| (Joint::ALL[i], Landmark::new(x, y, v)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn frames_survive_json(reported in any_reported()) {
            let frame = JointFrame::from_landmarks(reported);
            let json = serde_json::to_string(&frame).unwrap();
            let parsed: JointFrame = serde_json::from_str(&json).unwrap();
            for (joint, lm) in frame.iter() {
                let back = parsed.get(joint);
                prop_assert!((back.x - lm.x).abs() < 1e-12);
                prop_assert!((back.y - lm.y).abs() < 1e-12);
                prop_assert!((back.visibility - lm.visibility).abs() < 1e-12);
            }
            prop_assert_eq!(parsed.missing_count(), frame.missing_count());
        }

        #[test]
        fn pixels_stay_on_the_grid(reported in any_reported(), w in 1u32..4000, h in 1u32..4000) {
            let frame = JointFrame::from_landmarks(reported);
            for joint in Joint::ALL {
                let p = frame.pixel(joint, FrameDims::new(w, h));
                prop_assert!(p.x >= 0.0 && p.x <= f64::from(w));
                prop_assert!(p.y >= 0.0 && p.y <= f64::from(h));
                prop_assert_eq!(p.x, p.x.trunc());
            }
        }
    }
}
