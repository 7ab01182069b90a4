//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FormcoachError, FormcoachResult};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Batch analysis settings.
    pub analysis: AnalysisDefaults,

    /// Exercise label smoothing.
    pub classification: ClassificationDefaults,

    /// Spoken coaching.
    pub coaching: CoachingConfig,

    /// Live session loop.
    pub live: LiveDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default batch analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    /// Process every Nth decoded frame.
    pub frame_stride: usize,

    /// Frames scoring below this are kept as key frames.
    pub key_frame_score_floor: u32,

    /// Number of issues stored with each key frame.
    pub key_frame_issue_limit: usize,

    /// Minimum form scores needed before reps are estimated.
    pub min_scores_for_rep_estimate: usize,
}

/// Exercise label smoothing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationDefaults {
    /// Number of recent raw labels kept.
    pub window: usize,

    /// Labels required before the majority is evaluated.
    pub min_samples: usize,

    /// Majority share that must be exceeded to switch the visible label.
    pub confidence_threshold: f64,
}

/// Spoken coaching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingConfig {
    /// Whether the speech worker is started.
    pub enabled: bool,

    /// Minimum seconds between feedback updates pushed from the live loop.
    pub feedback_interval_secs: f64,

    /// Minimum seconds between coaching messages inside the coach.
    pub cooldown_secs: f64,

    /// Bounded speech queue capacity.
    pub queue_capacity: usize,

    /// How long shutdown waits for the speech worker.
    pub shutdown_timeout_ms: u64,

    /// Recommended rest length in seconds.
    pub rest_duration_secs: f64,

    /// Rep count that triggers a rest recommendation.
    pub rest_rep_threshold: u32,

    /// External text-to-speech program and arguments; the message is appended.
    pub speech_command: Option<Vec<String>>,
}

/// Live loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDefaults {
    /// Frame-source failures tolerated in a row before the loop stops.
    pub max_consecutive_errors: u32,

    /// Recent form scores retained for the session summary.
    pub form_history: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "formcoach=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            frame_stride: 3,
            key_frame_score_floor: 70,
            key_frame_issue_limit: 2,
            min_scores_for_rep_estimate: 10,
        }
    }
}

impl Default for ClassificationDefaults {
    fn default() -> Self {
        Self {
            window: 10,
            min_samples: 5,
            confidence_threshold: 0.6,
        }
    }
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feedback_interval_secs: 8.0,
            cooldown_secs: 5.0,
            queue_capacity: 16,
            shutdown_timeout_ms: 2000,
            rest_duration_secs: 60.0,
            rest_rep_threshold: 15,
            speech_command: None,
        }
    }
}

impl Default for LiveDefaults {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 10,
            form_history: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> FormcoachResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FormcoachError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> FormcoachResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> FormcoachResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply `FORMCOACH_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("FORMCOACH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(voice) = lookup("FORMCOACH_VOICE_ENABLED") {
            self.coaching.enabled = voice.eq_ignore_ascii_case("true");
        }
        if let Some(stride) = lookup("FORMCOACH_FRAME_STRIDE") {
            match stride.parse::<usize>() {
                Ok(stride) if stride > 0 => self.analysis.frame_stride = stride,
                _ => tracing::warn!(value = %stride, "Ignoring invalid FORMCOACH_FRAME_STRIDE"),
            }
        }
    }

    /// Reject values that would make the analysis meaningless.
    pub fn validate(&self) -> FormcoachResult<()> {
        if self.analysis.frame_stride == 0 {
            return Err(FormcoachError::config("analysis.frame_stride must be at least 1"));
        }
        if self.classification.window == 0 {
            return Err(FormcoachError::config("classification.window must be at least 1"));
        }
        if self.classification.min_samples > self.classification.window {
            return Err(FormcoachError::config(
                "classification.min_samples cannot exceed classification.window",
            ));
        }
        if !(0.0..=1.0).contains(&self.classification.confidence_threshold) {
            return Err(FormcoachError::config(
                "classification.confidence_threshold must be within [0, 1]",
            ));
        }
        if self.coaching.queue_capacity == 0 {
            return Err(FormcoachError::config("coaching.queue_capacity must be at least 1"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("formcoach").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.frame_stride, 3);
        assert_eq!(config.analysis.key_frame_score_floor, 70);
        assert_eq!(config.classification.window, 10);
        assert!((config.classification.confidence_threshold - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"analysis": {"frame_stride": 5}}"#).unwrap();
        assert_eq!(config.analysis.frame_stride, 5);
        assert_eq!(config.analysis.key_frame_score_floor, 70);
        assert_eq!(config.live.max_consecutive_errors, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("formcoach_test_config");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.coaching.enabled = true;
        config.coaching.speech_command = Some(vec!["espeak".to_string()]);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = AppConfig::load_from("/nonexistent/formcoach/config.json").unwrap_err();
        assert!(matches!(err, FormcoachError::FileNotFound { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_stride() {
        let mut config = AppConfig::default();
        config.analysis.frame_stride = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "FORMCOACH_LOG_LEVEL" => Some("debug".to_string()),
            "FORMCOACH_VOICE_ENABLED" => Some("TRUE".to_string()),
            "FORMCOACH_FRAME_STRIDE" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.logging.level, "debug");
        assert!(config.coaching.enabled);
        // invalid stride is ignored
        assert_eq!(config.analysis.frame_stride, 3);
    }
}
