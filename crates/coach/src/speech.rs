//! Speech output sinks.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use formcoach_common::{FormcoachError, FormcoachResult};

/// Something that can say a coaching message. Calls may block.
pub trait SpeechSink: Send {
    fn speak(&mut self, text: &str) -> FormcoachResult<()>;
}

/// Writes messages to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn speak(&mut self, text: &str) -> FormcoachResult<()> {
        tracing::info!(target: "formcoach::speech", text, "Speaking");
        Ok(())
    }
}

/// Runs an external text-to-speech program once per message.
///
/// The message is appended as the last argument, e.g. `["espeak", "-s", "170"]`.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list; the first entry is the program.
    pub fn from_argv(argv: &[String]) -> FormcoachResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| FormcoachError::config("speech_command must name a program"))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl SpeechSink for CommandSpeech {
    fn speak(&mut self, text: &str) -> FormcoachResult<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FormcoachError::coaching(format!("Failed to start {}: {e}", self.program))
            })?;

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        let status = child
            .wait()
            .map_err(|e| FormcoachError::coaching(format!("{} did not finish: {e}", self.program)))?;

        if !status.success() {
            return Err(FormcoachError::coaching(format!(
                "{} exited with {status}: {}",
                self.program,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Collects messages in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySpeech {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl MemorySpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages spoken so far.
    pub fn spoken(&self) -> Vec<String> {
        match self.spoken.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SpeechSink for MemorySpeech {
    fn speak(&mut self, text: &str) -> FormcoachResult<()> {
        let mut guard = self
            .spoken
            .lock()
            .map_err(|_| FormcoachError::coaching("speech buffer poisoned"))?;
        guard.push(text.to_string());
        Ok(())
    }
}
