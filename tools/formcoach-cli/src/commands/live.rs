//! Replay a pose stream through the live engine.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use formcoach_coach::{Coach, CoachSettings, CommandSpeech, LogSpeech, SpeechSink, VoiceWorker};
use formcoach_common::config::AppConfig;
use formcoach_live_engine::{LiveSession, LiveSettings, TimeBase};
use formcoach_pose_model::{FrameSource, JsonlFrameSource, PoseSample, StreamError, StreamHeader};

/// Delivers frames no faster than the stream's nominal rate.
struct Paced<S> {
    inner: S,
    interval: Duration,
}

impl<S: FrameSource> FrameSource for Paced<S> {
    fn header(&self) -> &StreamHeader {
        self.inner.header()
    }

    fn next_frame(&mut self) -> Result<Option<PoseSample>, StreamError> {
        std::thread::sleep(self.interval);
        self.inner.next_frame()
    }
}

/// Pause between frames at `fps`, or `None` when the rate cannot be paced.
fn frame_interval(fps: f64) -> Option<Duration> {
    if fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).ok()
    } else {
        None
    }
}

pub async fn run(config: AppConfig, path: PathBuf, voice: bool, realtime: bool) -> anyhow::Result<()> {
    let source = JsonlFrameSource::open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open pose stream: {e}"))?;
    let header = source.header().clone();

    let mut settings = LiveSettings::from_config(&config);
    if realtime {
        settings.time_base = TimeBase::Wall;
    }
    let mut session = LiveSession::new(settings, header.dims());

    if voice || config.coaching.enabled {
        let sink: Box<dyn SpeechSink> = match &config.coaching.speech_command {
            Some(argv) => Box::new(CommandSpeech::from_argv(argv)?),
            None => Box::new(LogSpeech),
        };
        session = session
            .with_coach(Coach::new(CoachSettings::from_config(&config.coaching), 0.0))
            .with_voice(VoiceWorker::from_config(sink, &config.coaching)?);
    }

    println!("Replaying pose stream: {}", path.display());
    println!("  {}x{} @ {} fps", header.width, header.height, header.fps);
    println!("Press Ctrl+C to stop...");
    println!();

    let stop = session.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let pacing = if realtime { frame_interval(header.fps) } else { None };
    if realtime && pacing.is_none() {
        tracing::warn!(fps = header.fps, "Frame rate cannot be paced, replaying at full speed");
    }

    let worker = tokio::task::spawn_blocking(move || {
        let result = match pacing {
            Some(interval) => session.run(&mut Paced {
                inner: source,
                interval,
            }),
            None => {
                let mut source = source;
                session.run(&mut source)
            }
        };
        let tip = result.as_ref().ok().and_then(|_| session.tip());
        let flushed = session.shutdown();
        (result, tip, flushed)
    });

    let (result, tip, flushed) = worker.await?;
    let summary = result?;
    if !flushed {
        tracing::warn!("Voice worker did not finish speaking before exit");
    }

    println!("Session finished ({:?})", summary.stop_reason);
    println!("  Started: {}", summary.started_at);
    println!("  Frames: {} ({} with pose)", summary.frames_seen, summary.frames_with_pose);
    println!("  Exercise: {}", summary.exercise.display_name());
    for (exercise, reps) in &summary.reps {
        println!("  {}: {reps} rep(s)", exercise.display_name());
    }
    println!("  Average form: {:.1}", summary.average_form_score);
    if summary.dropped_messages > 0 {
        println!("  Coaching messages skipped: {}", summary.dropped_messages);
    }
    if let Some(tip) = tip {
        println!();
        println!("{tip}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(4.0), Some(Duration::from_millis(250)));
        assert_eq!(frame_interval(0.0), None);
        assert_eq!(frame_interval(-1.0), None);
    }

    #[test]
    fn test_tiny_frame_rate_is_not_paced() {
        assert_eq!(frame_interval(1e-300), None);
        assert_eq!(frame_interval(f64::MIN_POSITIVE), None);
    }
}
