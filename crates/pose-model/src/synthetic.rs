//! Deterministic synthetic pose generation.
//!
//! Builds stick figures in pixel space whose primary joint angle is known
//! exactly, then normalizes them so that pixel truncation during feature
//! extraction lands back on the intended integer pixel. Used for fixtures,
//! demos (`formcoach synth`), and end-to-end tests.

use std::f64::consts::PI;

use crate::exercise::ExerciseLabel;
use crate::joint::{FrameDims, Joint, JointFrame, Landmark, Point2};
use crate::stream::{PoseSample, StreamHeader};

/// Generation parameters.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Frame dimensions of the generated stream.
    pub dims: FrameDims,
    /// Visibility assigned to every joint.
    pub visibility: f64,
    /// Frames spent on one full repetition.
    pub frames_per_rep: usize,
    /// Frames held at the rest angle before and after the reps.
    pub hold_frames: usize,
    /// Nominal frame rate written to the header.
    pub fps: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            dims: FrameDims::default(),
            visibility: 0.95,
            frames_per_rep: 30,
            hold_frames: 6,
            fps: 30.0,
        }
    }
}

/// Rest and peak angles of the primary joint for each exercise.
///
/// Squat and push-up drive the knee/elbow from straight to bent, curls
/// drive the elbow from extended to fully curled. Planks and unknown
/// poses are static.
pub fn angle_range(exercise: ExerciseLabel) -> (f64, f64) {
    match exercise {
        ExerciseLabel::Squat => (170.0, 90.0),
        ExerciseLabel::PushUp => (170.0, 90.0),
        ExerciseLabel::BicepCurl => (165.0, 40.0),
        ExerciseLabel::Plank | ExerciseLabel::Unknown => (180.0, 180.0),
    }
}

/// Build a single pose with the exercise's primary joint at `angle_deg`.
pub fn pose(exercise: ExerciseLabel, angle_deg: f64, config: &SyntheticConfig) -> JointFrame {
    let angle = angle_deg.clamp(0.0, 180.0);
    let points = match exercise {
        ExerciseLabel::Squat => standing_figure(angle, 180.0),
        ExerciseLabel::BicepCurl => standing_figure(180.0, angle),
        ExerciseLabel::Unknown => standing_figure(180.0, 180.0),
        ExerciseLabel::PushUp => horizontal_figure(70.0, angle),
        ExerciseLabel::Plank => horizontal_figure(50.0, 180.0),
    };
    normalize(&points, config)
}

/// Generate a full stream: hold, `reps` cycles, hold.
///
/// Each cycle leaves the rest angle quickly and lingers near the peak,
/// like a real set where the working position dominates.
pub fn generate(
    exercise: ExerciseLabel,
    reps: usize,
    config: &SyntheticConfig,
) -> (StreamHeader, Vec<PoseSample>) {
    let (rest, peak) = angle_range(exercise);
    let per_rep = config.frames_per_rep.max(2);

    let mut angles = vec![rest; config.hold_frames];
    for _ in 0..reps {
        for t in 0..per_rep {
            let phase = 2.0 * PI * t as f64 / per_rep as f64;
            let weight = ((1.0 + phase.cos()) / 2.0).powi(2);
            angles.push(peak + (rest - peak) * weight);
        }
    }
    angles.extend(std::iter::repeat(rest).take(config.hold_frames));

    let samples: Vec<PoseSample> = angles
        .iter()
        .enumerate()
        .map(|(i, &a)| PoseSample::new(i as u64, Some(pose(exercise, a, config))))
        .collect();

    let mut header = StreamHeader::new(config.dims.width, config.dims.height, config.fps);
    header.total_frames = Some(samples.len() as u64);
    (header, samples)
}

/// Rotate the downward unit vector by `deg` (toward -x) and scale it.
fn from_down(deg: f64, len: f64) -> (f64, f64) {
    let r = deg.to_radians();
    (-r.sin() * len, r.cos() * len)
}

/// Upright figure facing +x, legs apart, arms hanging.
///
/// `knee_deg` sets both knee and hip angles (torso stays vertical),
/// `elbow_deg` bends the forearms forward and up.
fn standing_figure(knee_deg: f64, elbow_deg: f64) -> Vec<(Joint, Point2)> {
    const SEGMENT: f64 = 100.0;
    const TORSO: f64 = 150.0;
    const FLOOR: f64 = 440.0;

    let mut points = Vec::with_capacity(Joint::COUNT);
    let sides = [
        (260.0, Joint::RightAnkle, Joint::RightKnee, Joint::RightHip, Joint::RightShoulder,
         Joint::RightElbow, Joint::RightWrist, Joint::RightHeel, Joint::RightFootIndex),
        (380.0, Joint::LeftAnkle, Joint::LeftKnee, Joint::LeftHip, Joint::LeftShoulder,
         Joint::LeftElbow, Joint::LeftWrist, Joint::LeftHeel, Joint::LeftFootIndex),
    ];

    let (thigh_dx, thigh_dy) = from_down(knee_deg, SEGMENT);
    let (arm_dx, arm_dy) = from_down(elbow_deg, 60.0);
    let mut shoulder_sum = Point2::default();

    for (x0, ankle, knee, hip, shoulder, elbow, wrist, heel, foot) in sides {
        let ankle_p = Point2::new(x0, FLOOR);
        let knee_p = Point2::new(x0, FLOOR - SEGMENT);
        // thigh points from knee toward hip, i.e. the knee->ankle ray rotated by the knee angle
        let hip_p = Point2::new(knee_p.x + thigh_dx, knee_p.y + thigh_dy);
        let shoulder_p = Point2::new(hip_p.x, hip_p.y - TORSO);
        let elbow_p = Point2::new(shoulder_p.x, shoulder_p.y + 70.0);
        // forearm: the elbow->shoulder ray points up, so mirror the downward rotation
        let wrist_p = Point2::new(elbow_p.x - arm_dx, elbow_p.y - arm_dy);

        points.push((ankle, ankle_p));
        points.push((knee, knee_p));
        points.push((hip, hip_p));
        points.push((shoulder, shoulder_p));
        points.push((elbow, elbow_p));
        points.push((wrist, wrist_p));
        points.push((heel, Point2::new(x0 - 10.0, FLOOR + 6.0)));
        points.push((foot, Point2::new(x0 + 25.0, FLOOR + 8.0)));

        shoulder_sum.x += shoulder_p.x / 2.0;
        shoulder_sum.y += shoulder_p.y / 2.0;
    }

    let nose = Point2::new(shoulder_sum.x, shoulder_sum.y - 40.0);
    points.push((Joint::Nose, nose));
    points.push((Joint::LeftEar, Point2::new(nose.x + 12.0, nose.y - 4.0)));
    points.push((Joint::RightEar, Point2::new(nose.x - 12.0, nose.y - 4.0)));
    points
}

/// Horizontal figure (push-up / plank) with the head toward +x.
///
/// `torso` is the shoulder-to-hip length, `elbow_deg` bends the arms.
fn horizontal_figure(torso: f64, elbow_deg: f64) -> Vec<(Joint, Point2)> {
    const LINE: f64 = 300.0;

    let hip = Point2::new(230.0, LINE);
    let shoulder = Point2::new(hip.x + torso, LINE);
    let elbow = Point2::new(shoulder.x, LINE + 40.0);
    let (arm_dx, arm_dy) = from_down(elbow_deg, 40.0);
    let wrist = Point2::new(elbow.x - arm_dx, elbow.y - arm_dy);
    let nose = Point2::new(shoulder.x + 30.0, LINE);

    let mut points = Vec::with_capacity(Joint::COUNT);
    for (ankle, knee, hip_j, shoulder_j, elbow_j, wrist_j, heel, foot) in [
        (Joint::RightAnkle, Joint::RightKnee, Joint::RightHip, Joint::RightShoulder,
         Joint::RightElbow, Joint::RightWrist, Joint::RightHeel, Joint::RightFootIndex),
        (Joint::LeftAnkle, Joint::LeftKnee, Joint::LeftHip, Joint::LeftShoulder,
         Joint::LeftElbow, Joint::LeftWrist, Joint::LeftHeel, Joint::LeftFootIndex),
    ] {
        points.push((ankle, Point2::new(150.0, LINE)));
        points.push((knee, Point2::new(190.0, LINE)));
        points.push((hip_j, hip));
        points.push((shoulder_j, shoulder));
        points.push((elbow_j, elbow));
        points.push((wrist_j, wrist));
        points.push((heel, Point2::new(145.0, LINE - 6.0)));
        points.push((foot, Point2::new(150.0, LINE + 10.0)));
    }
    points.push((Joint::Nose, nose));
    points.push((Joint::LeftEar, Point2::new(nose.x - 4.0, nose.y - 10.0)));
    points.push((Joint::RightEar, Point2::new(nose.x - 4.0, nose.y + 10.0)));
    points
}

fn normalize(points: &[(Joint, Point2)], config: &SyntheticConfig) -> JointFrame {
    let w = f64::from(config.dims.width.max(1));
    let h = f64::from(config.dims.height.max(1));
    JointFrame::from_landmarks(points.iter().map(|(joint, p)| {
        // centre of the target pixel so truncation recovers it exactly
        let px = p.x.round().clamp(0.0, w - 1.0);
        let py = p.y.round().clamp(0.0, h - 1.0);
        (
            *joint,
            Landmark::new((px + 0.5) / w, (py + 0.5) / h, config.visibility),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_joint_is_reported() {
        let config = SyntheticConfig::default();
        for exercise in ExerciseLabel::ALL {
            let frame = pose(exercise, 120.0, &config);
            assert_eq!(frame.missing_count(), 0, "{exercise} left joints unset");
        }
    }

    #[test]
    fn test_pixels_survive_truncation() {
        let config = SyntheticConfig::default();
        let frame = pose(ExerciseLabel::Squat, 180.0, &config);
        assert_eq!(
            frame.pixel(Joint::RightAnkle, config.dims),
            Point2::new(260.0, 440.0)
        );
        assert_eq!(
            frame.pixel(Joint::RightHip, config.dims),
            Point2::new(260.0, 240.0)
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = SyntheticConfig::default();
        let (header_a, a) = generate(ExerciseLabel::BicepCurl, 3, &config);
        let (header_b, b) = generate(ExerciseLabel::BicepCurl, 3, &config);
        assert_eq!(header_a, header_b);
        assert_eq!(a, b);
        assert_eq!(a.len(), 6 + 3 * 30 + 6);
        assert_eq!(header_a.total_frames, Some(a.len() as u64));
    }
}
