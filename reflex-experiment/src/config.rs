//! Session parameters.
//!
//! The parameter file is a JSON object:
//! ```json
//! { "loop_count1": 10, "loop_count2": 0, "sample_time": 10.0, "on_time": 500 }
//! ```
//! `wait_min` / `wait_max` (seconds) are optional and bound the random
//! pre-stimulus wait. Unknown keys are ignored so the same file can carry
//! hardware wiring for the binary.

use reflex_core::ChannelId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_WAIT_MIN_S: f64 = 0.5;
pub const DEFAULT_WAIT_MAX_S: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read parameter file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed parameter file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid parameter `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Timing bounds shared by every trial of a session
#[derive(Debug, Clone, PartialEq)]
pub struct TrialConfig {
    pub sample_period_ms: f64,
    pub stimulus_window_ms: u32,
    pub wait_min_s: f64,
    pub wait_max_s: f64,
}

/// Trials to run on one input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    pub channel: ChannelId,
    pub trial_count: usize,
}

/// Indicator pulses marking the start, plan boundaries and end of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPattern {
    pub start_pulses: usize,
    pub between_pulses: usize,
    pub end_pulses: usize,
    pub pulse_on_ms: u64,
    pub pulse_off_ms: u64,
}

impl Default for SignalPattern {
    fn default() -> Self {
        Self {
            start_pulses: 3,
            between_pulses: 3,
            end_pulses: 5,
            pulse_on_ms: 100,
            pulse_off_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub trial: TrialConfig,
    pub plans: Vec<ChannelPlan>,
    pub signals: SignalPattern,
}

#[derive(Debug, Deserialize)]
struct ParamFile {
    loop_count1: usize,
    loop_count2: usize,
    sample_time: f64,
    on_time: u32,
    #[serde(default = "default_wait_min")]
    wait_min: f64,
    #[serde(default = "default_wait_max")]
    wait_max: f64,
}

fn default_wait_min() -> f64 {
    DEFAULT_WAIT_MIN_S
}

fn default_wait_max() -> f64 {
    DEFAULT_WAIT_MAX_S
}

impl ExperimentConfig {
    /// Loads and validates the parameter file.
    ///
    /// # Errors
    /// Fails when the path is not a regular file, cannot be read, is not
    /// valid JSON, lacks a required key, or carries out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading parameters from: {}", path.display());

        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            trials = config.total_trials(),
            sample_period_ms = config.trial.sample_period_ms,
            stimulus_window_ms = config.trial.stimulus_window_ms,
            "Parameters loaded"
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let params: ParamFile =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        debug!(?params, "Parsed parameter file");
        Self::from_params(params)
    }

    fn from_params(p: ParamFile) -> Result<Self, ConfigError> {
        if !p.sample_time.is_finite() || p.sample_time <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "sample_time",
                reason: format!("must be a positive number of milliseconds, got {}", p.sample_time),
            });
        }
        if p.on_time == 0 {
            return Err(ConfigError::Invalid {
                key: "on_time",
                reason: "must be a positive number of milliseconds".into(),
            });
        }
        if !p.wait_min.is_finite() || p.wait_min < 0.0 {
            return Err(ConfigError::Invalid {
                key: "wait_min",
                reason: format!("must be a non-negative number of seconds, got {}", p.wait_min),
            });
        }
        if !p.wait_max.is_finite() || p.wait_max < p.wait_min {
            return Err(ConfigError::Invalid {
                key: "wait_max",
                reason: format!("must be at least wait_min ({}), got {}", p.wait_min, p.wait_max),
            });
        }

        Ok(Self {
            trial: TrialConfig {
                sample_period_ms: p.sample_time,
                stimulus_window_ms: p.on_time,
                wait_min_s: p.wait_min,
                wait_max_s: p.wait_max,
            },
            plans: vec![
                ChannelPlan {
                    channel: ChannelId(1),
                    trial_count: p.loop_count1,
                },
                ChannelPlan {
                    channel: ChannelId(2),
                    trial_count: p.loop_count2,
                },
            ],
            signals: SignalPattern::default(),
        })
    }

    pub fn total_trials(&self) -> usize {
        self.plans.iter().map(|p| p.trial_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_parameter_file() {
        let f = json_tempfile(
            r#"{"loop_count1": 10, "loop_count2": 4, "sample_time": 10.0, "on_time": 500}"#,
        );
        let cfg = ExperimentConfig::load(f.path()).unwrap();

        assert_eq!(cfg.trial.sample_period_ms, 10.0);
        assert_eq!(cfg.trial.stimulus_window_ms, 500);
        assert_eq!(cfg.trial.wait_min_s, DEFAULT_WAIT_MIN_S);
        assert_eq!(cfg.trial.wait_max_s, DEFAULT_WAIT_MAX_S);
        assert_eq!(
            cfg.plans,
            vec![
                ChannelPlan { channel: ChannelId(1), trial_count: 10 },
                ChannelPlan { channel: ChannelId(2), trial_count: 4 },
            ]
        );
        assert_eq!(cfg.total_trials(), 14);
    }

    #[test]
    fn wait_bounds_override_defaults() {
        let cfg = ExperimentConfig::from_json(
            r#"{"loop_count1": 1, "loop_count2": 1, "sample_time": 5, "on_time": 300,
                "wait_min": 0.0, "wait_max": 0.0}"#,
        )
        .unwrap();
        assert_eq!(cfg.trial.wait_min_s, 0.0);
        assert_eq!(cfg.trial.wait_max_s, 0.0);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let cfg = ExperimentConfig::from_json(
            r#"{"loop_count1": 1, "loop_count2": 0, "sample_time": 5, "on_time": 300,
                "hardware": {"backend": "sysfs"}}"#,
        );
        assert!(cfg.is_ok());
    }

    #[test]
    fn zero_trial_plan_is_valid() {
        let cfg = ExperimentConfig::from_json(
            r#"{"loop_count1": 0, "loop_count2": 0, "sample_time": 10, "on_time": 500}"#,
        )
        .unwrap();
        assert_eq!(cfg.total_trials(), 0);
        assert_eq!(cfg.plans.len(), 2);
    }

    #[test]
    fn missing_on_time_is_parse_error() {
        let f = json_tempfile(r#"{"loop_count1": 3, "loop_count2": 0, "sample_time": 10}"#);
        let err = ExperimentConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
        assert!(err.to_string().contains("on_time"), "got {err}");
    }

    #[test]
    fn negative_loop_count_is_parse_error() {
        let err = ExperimentConfig::from_json(
            r#"{"loop_count1": -1, "loop_count2": 0, "sample_time": 10, "on_time": 500}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExperimentConfig::load(&dir.path().join("project01.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn directory_is_not_a_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExperimentConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn rejects_non_positive_sample_time() {
        let err = ExperimentConfig::from_json(
            r#"{"loop_count1": 1, "loop_count2": 0, "sample_time": 0, "on_time": 500}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "sample_time", .. }));
    }

    #[test]
    fn rejects_zero_window() {
        let err = ExperimentConfig::from_json(
            r#"{"loop_count1": 1, "loop_count2": 0, "sample_time": 10, "on_time": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "on_time", .. }));
    }

    #[test]
    fn rejects_inverted_wait_bounds() {
        let err = ExperimentConfig::from_json(
            r#"{"loop_count1": 1, "loop_count2": 0, "sample_time": 10, "on_time": 500,
                "wait_min": 3.0, "wait_max": 1.0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "wait_max", .. }));
    }
}
