//! Background speech worker.
//!
//! Exactly one thread drains a bounded queue of messages into a
//! [`SpeechSink`]. Producers never block: when the queue is full the
//! message is dropped and counted. Shutdown enqueues a sentinel so
//! already queued messages are still spoken, then waits a bounded time
//! for the worker before detaching it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use formcoach_common::{CoachingConfig, FormcoachError, FormcoachResult};

use crate::speech::SpeechSink;

enum VoiceCommand {
    Say(String),
    Shutdown,
}

/// Handle to the speech worker thread.
pub struct VoiceWorker {
    tx: SyncSender<VoiceCommand>,
    stop: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    dropped: AtomicU64,
    shutdown_timeout: Duration,
}

impl VoiceWorker {
    /// Start the worker with a queue holding at most `queue_capacity` messages.
    pub fn spawn(
        mut sink: Box<dyn SpeechSink>,
        queue_capacity: usize,
        shutdown_timeout: Duration,
    ) -> FormcoachResult<Self> {
        let (tx, rx) = mpsc::sync_channel::<VoiceCommand>(queue_capacity.max(1));
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_worker = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("formcoach-voice".to_string())
            .spawn(move || {
                let mut spoken: u64 = 0;
                while let Ok(command) = rx.recv() {
                    let VoiceCommand::Say(text) = command else {
                        break;
                    };
                    if stop_worker.load(Ordering::SeqCst) {
                        break;
                    }
                    match sink.speak(&text) {
                        Ok(()) => spoken += 1,
                        Err(e) => tracing::warn!(error = %e, "Speech failed"),
                    }
                }
                tracing::debug!(spoken, "Voice worker exiting");
                let _ = done_tx.send(());
            })
            .map_err(|e| FormcoachError::coaching(format!("Failed to start voice worker: {e}")))?;

        tracing::debug!(queue_capacity, "Voice worker started");

        Ok(Self {
            tx,
            stop,
            done_rx,
            handle: Some(handle),
            dropped: AtomicU64::new(0),
            shutdown_timeout,
        })
    }

    /// Start a worker sized from the coaching config.
    pub fn from_config(sink: Box<dyn SpeechSink>, config: &CoachingConfig) -> FormcoachResult<Self> {
        Self::spawn(
            sink,
            config.queue_capacity,
            Duration::from_millis(config.shutdown_timeout_ms),
        )
    }

    /// Queue a message without blocking. Returns false if it was dropped.
    pub fn say(&self, text: impl Into<String>) -> bool {
        match self.tx.try_send(VoiceCommand::Say(text.into())) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Voice queue full, skipping message");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Voice worker is gone, skipping message");
                false
            }
        }
    }

    /// Messages dropped because the queue was full or the worker had exited.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the worker. Returns true if it finished within the timeout.
    pub fn shutdown(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };

        if let Err(TrySendError::Full(_)) = self.tx.try_send(VoiceCommand::Shutdown) {
            // no room for the sentinel; abandon the backlog instead
            self.stop.store(true, Ordering::SeqCst);
        }

        match self.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    tracing::warn!("Voice worker panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                self.stop.store(true, Ordering::SeqCst);
                tracing::warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Voice worker did not stop in time; detaching"
                );
                false
            }
        }
    }
}

impl Drop for VoiceWorker {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for VoiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceWorker")
            .field("running", &self.handle.is_some())
            .field("dropped", &self.dropped())
            .finish()
    }
}
