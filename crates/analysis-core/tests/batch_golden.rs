use formcoach_analysis_core::form::FormAnalysisResult;
use formcoach_analysis_core::{BatchAnalyzer, SessionAggregate};
use formcoach_common::{AnalysisDefaults, FormcoachError};
use formcoach_pose_model::synthetic::{generate, SyntheticConfig};
use formcoach_pose_model::{
    parse_pose_stream, write_pose_stream, ExerciseLabel, JsonlFrameSource, PoseSample,
    StreamHeader,
};

fn scored(score: u32, issues: &[&str]) -> FormAnalysisResult {
    FormAnalysisResult {
        score,
        issues: issues.iter().map(|s| s.to_string()).collect(),
        recommendations: issues.iter().map(|s| format!("{s}!")).collect(),
    }
}

#[test]
fn ten_frame_session_summary() {
    let scores = [90, 40, 85, 88, 35, 91, 89, 87, 86, 90];
    let unknown_at = [2, 6, 9];

    let mut aggregate = SessionAggregate::new(AnalysisDefaults::default());
    for (i, &score) in scores.iter().enumerate() {
        let label = if unknown_at.contains(&i) {
            ExerciseLabel::Unknown
        } else {
            ExerciseLabel::Squat
        };
        let issues: &[&str] = if score < 70 {
            &["Squatting too deep - risk of knee injury", "Hips not hinging properly", "Stance too narrow"]
        } else {
            &[]
        };
        aggregate.record(i as u64 * 3, label, &scored(score, issues));
    }

    let report = aggregate.finalize(1.0, 30.0).unwrap();
    assert_eq!(report.exercise_detected, ExerciseLabel::Squat);
    assert!((report.confidence - 0.7).abs() < 1e-12);
    assert_eq!(report.overall_score, 78);
    assert_eq!(report.rep_count, 1);
    assert_eq!(report.frames_analyzed, 10);
    assert_eq!(report.form_scores, scores.to_vec());

    let key: Vec<(u64, u32)> = report.key_frames.iter().map(|k| (k.frame, k.score)).collect();
    assert_eq!(key, vec![(3, 40), (12, 35)]);
    for key_frame in &report.key_frames {
        assert_eq!(
            key_frame.issues,
            vec!["Squatting too deep - risk of knee injury", "Hips not hinging properly"]
        );
    }
    assert_eq!(report.issues_detected.len(), 3);
}

#[test]
fn synthetic_squat_set_is_detected() {
    let (header, samples) = generate(ExerciseLabel::Squat, 3, &SyntheticConfig::default());
    let report = BatchAnalyzer::default()
        .analyze_samples(header, samples)
        .unwrap();

    assert_eq!(report.exercise_detected, ExerciseLabel::Squat);
    assert!(report.confidence > 0.5 && report.confidence <= 1.0);
    // 6 + 90 + 6 frames, every third one sampled
    assert_eq!(report.frames_analyzed, 34);
    assert!((report.video_duration - 102.0 / 30.0).abs() < 1e-9);
    assert!(report.form_scores.iter().all(|&s| s <= 100));
}

#[test]
fn analysis_is_reproducible() {
    let (header, samples) = generate(ExerciseLabel::BicepCurl, 4, &SyntheticConfig::default());
    let analyzer = BatchAnalyzer::default();

    let first = analyzer
        .analyze_samples(header.clone(), samples.clone())
        .unwrap();
    let second = analyzer.analyze_samples(header, samples).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn stream_round_trip_gives_same_report() {
    let (header, samples) = generate(ExerciseLabel::PushUp, 2, &SyntheticConfig::default());
    let direct = BatchAnalyzer::default()
        .analyze_samples(header.clone(), samples.clone())
        .unwrap();

    let mut buf = Vec::new();
    write_pose_stream(&mut buf, &header, &samples).unwrap();
    let (parsed_header, parsed) = parse_pose_stream(std::str::from_utf8(&buf).unwrap()).unwrap();
    let replayed = BatchAnalyzer::default()
        .analyze_samples(parsed_header, parsed)
        .unwrap();

    assert_eq!(direct.exercise_detected, ExerciseLabel::PushUp);
    assert_eq!(direct.form_scores, replayed.form_scores);
    assert_eq!(direct.exercise_detected, replayed.exercise_detected);
}

#[test]
fn video_without_people_reports_no_pose() {
    let header = StreamHeader::new(640, 480, 30.0);
    let samples: Vec<PoseSample> = (0..90).map(|i| PoseSample::new(i, None)).collect();
    let err = BatchAnalyzer::default()
        .analyze_samples(header, samples)
        .unwrap_err();
    assert!(matches!(err, FormcoachError::NoPoseDetected));
    assert_eq!(err.to_string(), "No pose landmarks detected in video");
}

#[test]
fn zero_fps_gives_zero_duration() {
    let (mut header, samples) = generate(ExerciseLabel::Squat, 1, &SyntheticConfig::default());
    header.fps = 0.0;
    let report = BatchAnalyzer::default()
        .analyze_samples(header, samples)
        .unwrap();
    assert_eq!(report.video_duration, 0.0);
}

#[test]
fn stride_follows_read_order_not_frame_numbers() {
    let (header, samples) = generate(ExerciseLabel::Squat, 1, &SyntheticConfig::default());
    let mut header = header;
    header.total_frames = None;
    // every third recorded frame number, as a provider that drops frames would write
    let gapped: Vec<PoseSample> = samples
        .into_iter()
        .take(30)
        .enumerate()
        .map(|(i, s)| PoseSample::new(i as u64 * 3, s.landmarks))
        .collect();

    let report = BatchAnalyzer::default()
        .analyze_samples(header, gapped)
        .unwrap();
    assert_eq!(report.frames_analyzed, 10);
    assert!((report.video_duration - 88.0 / 30.0).abs() < 1e-9);
}

#[test]
fn largest_frame_number_does_not_overflow() {
    let (header, samples) = generate(ExerciseLabel::Squat, 1, &SyntheticConfig::default());
    let mut header = header;
    header.total_frames = None;
    let landmarks = samples[0].landmarks.clone();
    let samples = vec![
        PoseSample::new(0, landmarks.clone()),
        PoseSample::new(u64::MAX, landmarks),
    ];

    let report = BatchAnalyzer::default()
        .analyze_samples(header, samples)
        .unwrap();
    assert_eq!(report.frames_analyzed, 1);
}

#[test]
fn undecodable_line_is_skipped_in_file_analysis() {
    let (header, samples) = generate(ExerciseLabel::Squat, 3, &SyntheticConfig::default());
    let mut buf = Vec::new();
    write_pose_stream(&mut buf, &header, &samples).unwrap();

    let mut lines: Vec<Vec<u8>> = buf.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
    lines[30] = b"{\"frame\":29,\"landmarks\":\xff}".to_vec();
    let corrupted = lines.join(&b'\n');

    let dir = std::env::temp_dir().join("formcoach_test_batch_utf8");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("squat.jsonl");
    std::fs::write(&path, corrupted).unwrap();

    let mut source = JsonlFrameSource::open(&path).unwrap();
    let report = BatchAnalyzer::default().analyze(&mut source).unwrap();
    assert_eq!(report.exercise_detected, ExerciseLabel::Squat);
    // the broken record still occupies its slot in the sampling order
    assert_eq!(report.frames_analyzed, 34);

    std::fs::remove_dir_all(&dir).ok();
}
