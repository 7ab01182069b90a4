//! Analyze a recorded pose stream.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use formcoach_analysis_core::BatchAnalyzer;
use formcoach_common::config::AppConfig;
use formcoach_common::FormcoachError;
use formcoach_pose_model::{AnalysisRecord, FrameSource, JsonlFrameSource};
use serde::Serialize;

/// Result record plus where and when it was produced.
#[derive(Serialize)]
struct AnalysisOutput<'a> {
    analyzed_at: DateTime<Utc>,
    source: String,
    #[serde(flatten)]
    record: &'a AnalysisRecord,
}

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    stride: Option<usize>,
) -> anyhow::Result<()> {
    let mut settings = config.analysis.clone();
    if let Some(stride) = stride {
        if stride == 0 {
            anyhow::bail!("--stride must be at least 1");
        }
        settings.frame_stride = stride;
    }

    let mut source = JsonlFrameSource::open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open pose stream: {e}"))?;
    let header = source.header().clone();
    eprintln!("Analyzing pose stream: {}", path.display());
    eprintln!(
        "  {}x{} @ {} fps, every {} frame(s)",
        header.width, header.height, header.fps, settings.frame_stride
    );

    let record = match BatchAnalyzer::new(settings).analyze(&mut source) {
        Ok(report) => {
            eprintln!(
                "  Detected {} ({:.0}% confidence), score {}, {} rep(s)",
                report.exercise_detected.display_name(),
                report.confidence * 100.0,
                report.overall_score,
                report.rep_count
            );
            AnalysisRecord::Report(report)
        }
        Err(e @ FormcoachError::NoPoseDetected) => {
            eprintln!("  {e}");
            AnalysisRecord::failure(e.to_string())
        }
        Err(e) => return Err(anyhow::anyhow!("Analysis failed: {e}")),
    };

    let out = AnalysisOutput {
        analyzed_at: Utc::now(),
        source: path.display().to_string(),
        record: &record,
    };
    let json = serde_json::to_string_pretty(&out)?;

    match output {
        Some(output) => {
            std::fs::write(&output, json)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;
            eprintln!("Result saved to: {}", output.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
