//! Validate a pose stream.

use std::path::PathBuf;

use formcoach_pose_model::{FrameSource, JsonlFrameSource};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating pose stream at: {}", path.display());

    let mut source = JsonlFrameSource::open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open pose stream: {e}"))?;
    let header = source.header().clone();

    println!("  Schema: {}", header.schema_version);
    println!("  Resolution: {}x{}", header.width, header.height);
    println!("  FPS: {}", header.fps);

    let mut frames = 0u64;
    let mut with_pose = 0u64;
    let mut malformed = 0u64;
    let mut missing_joints = 0usize;
    let mut last_frame: Option<u64> = None;
    let mut out_of_order = 0u64;
    let mut errors = Vec::new();

    loop {
        match source.next_frame() {
            Ok(Some(sample)) => {
                frames += 1;
                if last_frame.is_some_and(|last| sample.frame <= last) {
                    out_of_order += 1;
                }
                last_frame = Some(sample.frame);
                if let Some(landmarks) = &sample.landmarks {
                    with_pose += 1;
                    missing_joints += landmarks.missing_count();
                    if landmarks.first_malformed().is_some() {
                        malformed += 1;
                    }
                }
            }
            Ok(None) => break,
            Err(e) if e.is_recoverable() => errors.push(e.to_string()),
            Err(e) => return Err(anyhow::anyhow!("Failed to read pose stream: {e}")),
        }
    }

    println!("  Frames: {frames}");
    println!("  Frames with pose: {with_pose}");
    if with_pose > 0 {
        println!(
            "  Missing joints per pose: {:.1}",
            missing_joints as f64 / with_pose as f64
        );
    }
    if let Some(total) = header.total_frames {
        if total != frames {
            errors.push(format!("Header declares {total} frames, found {frames}"));
        }
    }
    if malformed > 0 {
        errors.push(format!("{malformed} frame(s) with non-finite coordinates"));
    }
    if out_of_order > 0 {
        errors.push(format!("{out_of_order} frame(s) out of order"));
    }
    if with_pose == 0 {
        errors.push("No pose landmarks in any frame".to_string());
    }

    if errors.is_empty() {
        println!("\nPose stream is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Analysis may be degraded.",
            errors.len()
        );
    }

    Ok(())
}
