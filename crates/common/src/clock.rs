//! Clock and timing utilities for analysis sessions.
//!
//! Live sessions are anchored to a monotonic epoch recorded when the
//! session starts (or is reset). This module provides utilities for:
//! - Capturing the epoch
//! - Gating periodic work (coaching feedback) to a minimum interval
//! - Measuring the effective analysis frame rate

use std::collections::VecDeque;
use std::time::Instant;

/// Fixed frame interval used for temporal features (30 FPS source).
pub const NOMINAL_FRAME_INTERVAL_SECS: f64 = 1.0 / 30.0;

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get seconds elapsed since session start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert a frame index at the given rate to seconds.
    ///
    /// Returns 0 for a non-positive rate.
    pub fn frame_to_secs(frame: u64, fps: f64) -> f64 {
        if fps > 0.0 {
            frame as f64 / fps
        } else {
            0.0
        }
    }
}

/// Gate that fires at most once per interval.
///
/// The first check always fires. Time is supplied by the caller so the
/// gate works with both wall-clock and stream time.
#[derive(Debug, Clone)]
pub struct IntervalGate {
    interval_secs: f64,
    last_fired_secs: Option<f64>,
}

impl IntervalGate {
    /// Create a gate with the given minimum interval.
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs: interval_secs.max(0.0),
            last_fired_secs: None,
        }
    }

    /// Returns true and records the time if the interval has strictly elapsed.
    pub fn should_fire(&mut self, now_secs: f64) -> bool {
        match self.last_fired_secs {
            None => {
                self.last_fired_secs = Some(now_secs);
                true
            }
            Some(last) if now_secs - last > self.interval_secs => {
                self.last_fired_secs = Some(now_secs);
                true
            }
            _ => false,
        }
    }

    /// Forget the last firing time.
    pub fn reset(&mut self) {
        self.last_fired_secs = None;
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }
}

/// Rolling frame-rate meter over the most recent frame timestamps.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    stamps: VecDeque<f64>,
    capacity: usize,
}

impl FpsMeter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            stamps: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a frame at `now_secs` and return the current rate.
    pub fn tick(&mut self, now_secs: f64) -> f64 {
        if self.stamps.len() == self.capacity {
            self.stamps.pop_front();
        }
        self.stamps.push_back(now_secs);
        self.fps()
    }

    /// Frames per second over the window, 0 until two frames are seen.
    pub fn fps(&self) -> f64 {
        match (self.stamps.front(), self.stamps.back()) {
            (Some(first), Some(last)) if self.stamps.len() > 1 && last > first => {
                self.stamps.len() as f64 / (last - first)
            }
            _ => 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(30)
    }
}
