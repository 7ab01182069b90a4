//! Write a synthetic pose stream.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use formcoach_pose_model::synthetic::{generate, SyntheticConfig};
use formcoach_pose_model::{write_pose_stream, ExerciseLabel};

pub fn run(
    exercise: ExerciseLabel,
    output: PathBuf,
    reps: usize,
    frames_per_rep: usize,
    fps: f64,
) -> anyhow::Result<()> {
    if fps <= 0.0 {
        anyhow::bail!("--fps must be positive");
    }

    let config = SyntheticConfig {
        frames_per_rep,
        fps,
        ..SyntheticConfig::default()
    };
    let (header, samples) = generate(exercise, reps, &config);

    let file = File::create(&output)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_pose_stream(&mut writer, &header, &samples)
        .map_err(|e| anyhow::anyhow!("Failed to write pose stream: {e}"))?;
    writer.flush()?;

    println!(
        "Wrote {} frames of {} ({reps} rep(s)) to {}",
        samples.len(),
        exercise.display_name(),
        output.display()
    );
    Ok(())
}
