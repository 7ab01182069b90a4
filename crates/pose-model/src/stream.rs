//! Pose stream format and frame sources.
//!
//! The external pose provider writes one JSON object per decoded frame
//! (JSONL). The first line may be a `#`-prefixed header describing the
//! source video:
//!
//! ```text
//! # {"schema_version":"1.0","width":640,"height":480,"fps":30.0,"total_frames":90}
//! {"frame":0,"landmarks":{"nose":{"x":0.5,"y":0.1,"visibility":0.98}, ...}}
//! {"frame":1,"landmarks":null}
//! ```
//!
//! `landmarks: null` is the provider's explicit "no landmarks" result.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use formcoach_common::error::FormcoachError;
use serde::{Deserialize, Serialize};

use crate::joint::{FrameDims, JointFrame};

/// Current pose stream schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// Source video metadata carried in the stream header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Frame dimensions in pixels.
    pub width: u32,
    pub height: u32,

    /// Nominal frame rate of the source.
    pub fps: f64,

    /// Total decoded frames, when the source knows it up front.
    #[serde(default)]
    pub total_frames: Option<u64>,
}

impl StreamHeader {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            width,
            height,
            fps,
            total_frames: None,
        }
    }

    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }

    /// Reject headers that cannot describe a real video.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.width == 0 || self.height == 0 {
            return Err(StreamError::ValidationError {
                message: format!("frame dimensions {}x{} are empty", self.width, self.height),
            });
        }
        if !self.fps.is_finite() || self.fps < 0.0 {
            return Err(StreamError::ValidationError {
                message: format!("frame rate {} is not usable", self.fps),
            });
        }
        Ok(())
    }
}

impl Default for StreamHeader {
    fn default() -> Self {
        Self::new(640, 480, 30.0)
    }
}

/// One decoded frame as seen through the pose provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Zero-based index of the decoded frame.
    pub frame: u64,

    /// Detected joints, or `None` when the provider found no pose.
    pub landmarks: Option<JointFrame>,
}

impl PoseSample {
    pub fn new(frame: u64, landmarks: Option<JointFrame>) -> Self {
        Self { frame, landmarks }
    }
}

/// Errors raised while reading or writing pose streams.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error on line {line}: {source}")]
    ParseError {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Invalid pose stream: {message}")]
    ValidationError { message: String },
}

impl StreamError {
    /// Whether the stream can keep going after this error (a single bad line).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StreamError::ParseError { .. })
    }
}

impl From<StreamError> for FormcoachError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::IoError { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                FormcoachError::FileNotFound { path }
            }
            other => FormcoachError::frame_source(other.to_string()),
        }
    }
}

/// An ordered, finite sequence of pose samples.
///
/// End of stream is `Ok(None)`, which is a normal termination.
pub trait FrameSource {
    /// Metadata of the underlying video.
    fn header(&self) -> &StreamHeader;

    /// Read the next sample.
    fn next_frame(&mut self) -> Result<Option<PoseSample>, StreamError>;
}

/// In-memory frame source.
#[derive(Debug, Clone)]
pub struct VecFrameSource {
    header: StreamHeader,
    samples: VecDeque<PoseSample>,
}

impl VecFrameSource {
    pub fn new(header: StreamHeader, samples: Vec<PoseSample>) -> Self {
        Self {
            header,
            samples: samples.into(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_frame(&mut self) -> Result<Option<PoseSample>, StreamError> {
        Ok(self.samples.pop_front())
    }
}

/// Lazily reads a JSONL pose stream from disk.
pub struct JsonlFrameSource {
    path: PathBuf,
    header: StreamHeader,
    reader: BufReader<File>,
    buf: Vec<u8>,
    pending: Option<Result<(usize, String), StreamError>>,
    line_no: usize,
}

impl JsonlFrameSource {
    /// Open a pose stream, reading its header if present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| StreamError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let mut source = Self {
            path,
            header: StreamHeader::default(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            pending: None,
            line_no: 0,
        };

        match source.next_content_line() {
            Err(e) if e.is_recoverable() => {
                tracing::warn!(path = %source.path.display(), error = %e, "Unreadable first line in pose stream");
                source.pending = Some(Err(e));
            }
            Err(e) => return Err(e),
            Ok(Some((line_no, line))) if line.starts_with('#') => {
                let json = line.trim_start_matches('#').trim();
                source.header = serde_json::from_str(json)
                    .map_err(|e| StreamError::ParseError { line: line_no, source: e })?;
                source.header.validate()?;
            }
            Ok(Some(first)) => {
                tracing::warn!(path = %source.path.display(), "Pose stream has no header, assuming 640x480 @ 30fps");
                source.pending = Some(Ok(first));
            }
            Ok(None) => {}
        }

        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next non-blank line. A line that is not valid UTF-8 is consumed and
    /// reported as a parse error so the caller can skip it.
    fn next_content_line(&mut self) -> Result<Option<(usize, String)>, StreamError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| StreamError::IoError {
                    path: self.path.clone(),
                    source: e,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = std::str::from_utf8(&self.buf).map_err(|e| StreamError::ParseError {
                line: self.line_no,
                source: serde::de::Error::custom(format!("line is not valid UTF-8: {e}")),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Only the first line may be a header; later comments are skipped.
            if trimmed.starts_with('#') && self.line_no > 1 {
                continue;
            }
            return Ok(Some((self.line_no, trimmed.to_string())));
        }
    }
}

impl FrameSource for JsonlFrameSource {
    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_frame(&mut self) -> Result<Option<PoseSample>, StreamError> {
        let next = match self.pending.take() {
            Some(line) => Some(line?),
            None => self.next_content_line()?,
        };
        match next {
            Some((line_no, line)) => serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| StreamError::ParseError {
                    line: line_no,
                    source: e,
                }),
            None => Ok(None),
        }
    }
}

/// Parse a complete pose stream held in memory.
pub fn parse_pose_stream(content: &str) -> Result<(StreamHeader, Vec<PoseSample>), StreamError> {
    let mut header = StreamHeader::default();
    let mut samples = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(json) = line.strip_prefix('#') {
            if idx == 0 {
                header = serde_json::from_str(json.trim())
                    .map_err(|e| StreamError::ParseError { line: 1, source: e })?;
                header.validate()?;
            }
            continue;
        }
        let sample = serde_json::from_str(line).map_err(|e| StreamError::ParseError {
            line: idx + 1,
            source: e,
        })?;
        samples.push(sample);
    }

    Ok((header, samples))
}

/// Write a pose stream (header line followed by one sample per line).
pub fn write_pose_stream<W: Write>(
    mut writer: W,
    header: &StreamHeader,
    samples: &[PoseSample],
) -> Result<(), FormcoachError> {
    let header_json = serde_json::to_string(header)?;
    writeln!(writer, "# {header_json}")?;
    for sample in samples {
        let json = serde_json::to_string(sample)?;
        writeln!(writer, "{json}")?;
    }
    writer.flush()?;
    Ok(())
}
