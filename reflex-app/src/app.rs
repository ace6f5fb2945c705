use crate::hardware::HardwareConfig;
use anyhow::{Context, Result};
use chrono::Local;
use reflex_experiment::{
    ExperimentConfig, ExperimentError, ResultWriter, SessionRunner, UniformScheduler, score,
};
use reflex_timing::MonotonicClock;
use std::path::PathBuf;
use tracing::{error, info};

pub const DEFAULT_PARAMS: &str = "project01.json";

pub struct App {
    params: PathBuf,
    output_dir: PathBuf,
}

impl App {
    pub fn new(params: PathBuf) -> Self {
        Self {
            params,
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Loads parameters, runs one session, scores it and writes the record.
    pub fn run(self) -> Result<()> {
        info!("=== REACTION TIME SESSION ===");
        info!("Platform: {}", std::env::consts::OS);

        // nothing touches the rig until the parameters are valid
        let config = ExperimentConfig::load(&self.params)
            .with_context(|| format!("Cannot start session from {}", self.params.display()))?;
        let hardware = HardwareConfig::load(&self.params)?;
        let rig = hardware.build()?;

        let mut channels = rig.channels;
        let mut runner = SessionRunner::new(
            config,
            MonotonicClock::new(),
            rig.indicator,
            UniformScheduler::from_entropy(),
        );
        let result = runner.run(&mut channels)?;
        let completed_at = Local::now();

        let report = match score(&result) {
            Ok(report) => report,
            Err(e) => {
                error!(misses = e.misses, total = e.total, "Every stimulus was missed");
                return Err(ExperimentError::from(e).into());
            }
        };

        for line in report.score_text.lines() {
            info!("{line}");
        }
        info!(hits = ?report.hits, score = report.score, "Session scored");

        let path = ResultWriter::new(&self.output_dir).write(&report, &result, completed_at)?;
        info!("Results saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_experiment::ConfigError;
    use std::fs;

    fn session_dir(params: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PARAMS);
        fs::write(&path, params).unwrap();
        (dir, path)
    }

    fn records(dir: &std::path::Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("proj1-"))
            .collect()
    }

    #[test]
    fn simulated_session_writes_record() {
        let (dir, params) = session_dir(
            r#"{"loop_count1": 2, "loop_count2": 1, "sample_time": 10, "on_time": 500,
                "wait_min": 0.0, "wait_max": 0.0,
                "hardware": {"backend": "simulated", "latency_ms": [20, 20], "miss_rate": 0.0}}"#,
        );

        App::new(params).with_output_dir(dir.path()).run().unwrap();

        let written = records(dir.path());
        assert_eq!(written.len(), 1);
        let json: serde_json::Value =
            serde_json::from_slice(&fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(json["report"]["total_count"], 3);
        assert_eq!(json["report"]["miss_count"], 0);
        assert_eq!(json["trials"][2]["channel"], 2);
    }

    #[test]
    fn missing_key_aborts_without_record() {
        let (dir, params) =
            session_dir(r#"{"loop_count1": 2, "loop_count2": 1, "sample_time": 10}"#);

        let err = App::new(params).with_output_dir(dir.path()).run().unwrap_err();

        assert!(err.downcast_ref::<ConfigError>().is_some(), "{err:#}");
        assert!(records(dir.path()).is_empty());
    }

    #[test]
    fn all_misses_fail_without_record() {
        let (dir, params) = session_dir(
            r#"{"loop_count1": 2, "loop_count2": 0, "sample_time": 1, "on_time": 20,
                "wait_min": 0.0, "wait_max": 0.0,
                "hardware": {"miss_rate": 1.0}}"#,
        );

        let err = App::new(params).with_output_dir(dir.path()).run().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ExperimentError>(),
            Some(ExperimentError::NoHits(_))
        ));
        assert!(records(dir.path()).is_empty());
    }
}
