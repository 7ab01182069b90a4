//! Per-frame feature extraction.
//!
//! A [`FeatureExtractor`] converts one [`JointFrame`] into a [`FeatureVector`]:
//! six joint angles, body-alignment measures, a visibility summary and, from
//! the second frame on, angular velocity against the previous frame.
//!
//! The extractor owns the angle history for exactly one analysis session.
//! Start a new session with [`FeatureExtractor::reset`] or a fresh instance.

use std::collections::{BTreeMap, VecDeque};

use formcoach_common::{FormcoachError, FormcoachResult, NOMINAL_FRAME_INTERVAL_SECS};
use formcoach_pose_model::{FrameDims, Joint, JointFrame, Point2};
use serde::{Deserialize, Serialize};

use crate::geometry::{angle, distance};

/// Angle sets retained for temporal features.
pub const HISTORY_CAPACITY: usize = 30;

/// Angular velocity above which a movement is flagged as fast, in deg/s.
pub const FAST_VELOCITY_DEG_PER_SEC: f64 = 100.0;

/// The six tracked joint angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    RightKnee,
    LeftKnee,
    RightHip,
    LeftHip,
    RightElbow,
    LeftElbow,
}

impl AngleKind {
    pub const ALL: [AngleKind; 6] = [
        AngleKind::RightKnee,
        AngleKind::LeftKnee,
        AngleKind::RightHip,
        AngleKind::LeftHip,
        AngleKind::RightElbow,
        AngleKind::LeftElbow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AngleKind::RightKnee => "right_knee",
            AngleKind::LeftKnee => "left_knee",
            AngleKind::RightHip => "right_hip",
            AngleKind::LeftHip => "left_hip",
            AngleKind::RightElbow => "right_elbow",
            AngleKind::LeftElbow => "left_elbow",
        }
    }

    /// `(a, vertex, c)` joints whose angle at the vertex is measured.
    pub fn joints(self) -> (Joint, Joint, Joint) {
        match self {
            AngleKind::RightKnee => (Joint::RightHip, Joint::RightKnee, Joint::RightAnkle),
            AngleKind::LeftKnee => (Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle),
            AngleKind::RightHip => (Joint::RightShoulder, Joint::RightHip, Joint::RightKnee),
            AngleKind::LeftHip => (Joint::LeftShoulder, Joint::LeftHip, Joint::LeftKnee),
            AngleKind::RightElbow => (Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist),
            AngleKind::LeftElbow => (Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The six joint angles of one frame, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    pub right_knee: f64,
    pub left_knee: f64,
    pub right_hip: f64,
    pub left_hip: f64,
    pub right_elbow: f64,
    pub left_elbow: f64,
}

impl JointAngles {
    pub fn get(&self, kind: AngleKind) -> f64 {
        match kind {
            AngleKind::RightKnee => self.right_knee,
            AngleKind::LeftKnee => self.left_knee,
            AngleKind::RightHip => self.right_hip,
            AngleKind::LeftHip => self.left_hip,
            AngleKind::RightElbow => self.right_elbow,
            AngleKind::LeftElbow => self.left_elbow,
        }
    }

    pub fn avg_knee(&self) -> f64 {
        (self.right_knee + self.left_knee) / 2.0
    }

    pub fn avg_hip(&self) -> f64 {
        (self.right_hip + self.left_hip) / 2.0
    }

    pub fn avg_elbow(&self) -> f64 {
        (self.right_elbow + self.left_elbow) / 2.0
    }
}

/// A single named scalar that rules can test against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Angle(AngleKind),
    AvgKnee,
    AvgHip,
    AvgElbow,
    Spine,
    KneeSymmetry,
    HipSymmetry,
    ShoulderSymmetry,
    FootDistance,
    TorsoLean,
    ShoulderHipDistance,
    AvgVisibility,
    MinVisibility,
    /// Angular velocity against the previous frame; 0 on the first frame.
    Velocity(AngleKind),
}

/// Derived numeric summary of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub angles: JointAngles,
    /// Nose -> shoulder centre -> hip centre.
    pub spine_angle: f64,
    pub knee_symmetry: f64,
    pub hip_symmetry: f64,
    pub shoulder_symmetry: f64,
    /// Distance between the two foot-index landmarks.
    pub foot_distance: f64,
    /// Horizontal offset between hip centre and shoulder centre.
    pub torso_lean: f64,
    pub shoulder_hip_distance: f64,
    pub avg_visibility: f64,
    pub min_visibility: f64,
    /// Per-angle velocity in deg/s, indexed like [`AngleKind::ALL`].
    /// Absent on the first frame of a session.
    pub velocities: Option<[f64; 6]>,
}

impl FeatureVector {
    /// Read one feature. Missing velocities read as 0.
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Angle(kind) => self.angles.get(kind),
            Feature::AvgKnee => self.angles.avg_knee(),
            Feature::AvgHip => self.angles.avg_hip(),
            Feature::AvgElbow => self.angles.avg_elbow(),
            Feature::Spine => self.spine_angle,
            Feature::KneeSymmetry => self.knee_symmetry,
            Feature::HipSymmetry => self.hip_symmetry,
            Feature::ShoulderSymmetry => self.shoulder_symmetry,
            Feature::FootDistance => self.foot_distance,
            Feature::TorsoLean => self.torso_lean,
            Feature::ShoulderHipDistance => self.shoulder_hip_distance,
            Feature::AvgVisibility => self.avg_visibility,
            Feature::MinVisibility => self.min_visibility,
            Feature::Velocity(kind) => self.velocity(kind).unwrap_or(0.0),
        }
    }

    pub fn velocity(&self, kind: AngleKind) -> Option<f64> {
        self.velocities.map(|v| v[kind.index()])
    }

    pub fn is_fast(&self, kind: AngleKind) -> bool {
        self.velocity(kind)
            .is_some_and(|v| v > FAST_VELOCITY_DEG_PER_SEC)
    }

    /// Flat `name -> value` view, e.g. for debug dumps.
    ///
    /// Fast-movement flags are reported as 1.0 / 0.0.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        for kind in AngleKind::ALL {
            map.insert(format!("{}_angle", kind.name()), self.angles.get(kind));
            if let Some(v) = self.velocity(kind) {
                map.insert(format!("{}_angle_velocity", kind.name()), v);
                let fast = if self.is_fast(kind) { 1.0 } else { 0.0 };
                map.insert(format!("{}_angle_is_fast", kind.name()), fast);
            }
        }
        map.insert("spine_angle".into(), self.spine_angle);
        map.insert("knee_symmetry".into(), self.knee_symmetry);
        map.insert("hip_symmetry".into(), self.hip_symmetry);
        map.insert("shoulder_symmetry".into(), self.shoulder_symmetry);
        map.insert("foot_distance".into(), self.foot_distance);
        map.insert("torso_lean".into(), self.torso_lean);
        map.insert("shoulder_hip_distance".into(), self.shoulder_hip_distance);
        map.insert("avg_visibility".into(), self.avg_visibility);
        map.insert("min_visibility".into(), self.min_visibility);
        map
    }
}

/// Session-scoped feature extractor.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    dims: FrameDims,
    history: VecDeque<JointAngles>,
}

impl FeatureExtractor {
    pub fn new(dims: FrameDims) -> Self {
        Self {
            dims,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    /// Number of angle sets currently retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Forget all temporal state.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Extract features from one frame.
    ///
    /// `None` (the provider found no body) and frames holding non-finite
    /// coordinates fail with [`FormcoachError::Extraction`]; the history is
    /// left untouched in that case.
    pub fn extract(&mut self, frame: Option<&JointFrame>) -> FormcoachResult<FeatureVector> {
        let frame = frame.ok_or_else(|| FormcoachError::extraction("no landmarks in frame"))?;
        if let Some(joint) = frame.first_malformed() {
            return Err(FormcoachError::extraction(format!(
                "non-finite coordinates for {}",
                joint.name()
            )));
        }

        let dims = self.dims;
        let px = |joint: Joint| frame.pixel(joint, dims);

        let angle_of = |kind: AngleKind| {
            let (a, b, c) = kind.joints();
            angle(px(a), px(b), px(c))
        };
        let angles = JointAngles {
            right_knee: angle_of(AngleKind::RightKnee),
            left_knee: angle_of(AngleKind::LeftKnee),
            right_hip: angle_of(AngleKind::RightHip),
            left_hip: angle_of(AngleKind::LeftHip),
            right_elbow: angle_of(AngleKind::RightElbow),
            left_elbow: angle_of(AngleKind::LeftElbow),
        };

        let hip_center = Point2::midpoint(&px(Joint::RightHip), &px(Joint::LeftHip));
        let shoulder_center =
            Point2::midpoint(&px(Joint::RightShoulder), &px(Joint::LeftShoulder));

        let vertical_gap = |right: Joint, left: Joint| (px(right).y - px(left).y).abs();

        let (vis_sum, vis_min) = frame
            .iter()
            .map(|(_, lm)| lm.visibility)
            .fold((0.0, f64::INFINITY), |(sum, min), v| (sum + v, min.min(v)));

        let velocities = self.push_history(angles);

        Ok(FeatureVector {
            angles,
            spine_angle: angle(px(Joint::Nose), shoulder_center, hip_center),
            knee_symmetry: vertical_gap(Joint::RightKnee, Joint::LeftKnee),
            hip_symmetry: vertical_gap(Joint::RightHip, Joint::LeftHip),
            shoulder_symmetry: vertical_gap(Joint::RightShoulder, Joint::LeftShoulder),
            foot_distance: distance(px(Joint::RightFootIndex), px(Joint::LeftFootIndex)),
            torso_lean: (hip_center.x - shoulder_center.x).abs(),
            shoulder_hip_distance: distance(shoulder_center, hip_center),
            avg_visibility: vis_sum / Joint::COUNT as f64,
            min_visibility: vis_min,
            velocities,
        })
    }

    /// Append the current angles, then compare against the entry before them.
    fn push_history(&mut self, current: JointAngles) -> Option<[f64; 6]> {
        self.history.push_back(current);
        if self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }

        let len = self.history.len();
        if len < 2 {
            return None;
        }
        let prev = self.history[len - 2];

        let mut velocities = [0.0; 6];
        for kind in AngleKind::ALL {
            velocities[kind.index()] =
                (current.get(kind) - prev.get(kind)).abs() / NOMINAL_FRAME_INTERVAL_SECS;
        }
        Some(velocities)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FrameDims::default())
    }
}
