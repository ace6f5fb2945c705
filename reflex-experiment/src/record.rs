use crate::error::ExperimentError;
use crate::score::Report;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike};
use reflex_core::{SessionResult, TrialRecord};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RECORD_PREFIX: &str = "proj1";
pub const RECORD_EXTENSION: &str = "json";

/// `proj1-2026-10-16T9_5_3.json` for 09:05:03 on 16 Oct 2026.
///
/// Fields are not zero-padded. Two sessions finishing within the same second
/// share a name and the later one overwrites.
pub fn record_file_name(prefix: &str, at: &NaiveDateTime, extension: &str) -> String {
    format!(
        "{prefix}-{}-{}-{}T{}_{}_{}.{extension}",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
    )
}

#[derive(Debug, Serialize)]
struct SessionRecord<'a> {
    completed_at: String,
    report: &'a Report,
    trials: &'a [TrialRecord],
}

/// Persists one JSON record per session
#[derive(Debug, Clone)]
pub struct ResultWriter {
    pub dir: PathBuf,
    pub prefix: String,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: RECORD_PREFIX.to_string(),
        }
    }

    pub fn path_for(&self, completed_at: &DateTime<Local>) -> PathBuf {
        self.dir.join(record_file_name(
            &self.prefix,
            &completed_at.naive_local(),
            RECORD_EXTENSION,
        ))
    }

    /// Writes the report and per-trial records. Not retried on failure.
    pub fn write(
        &self,
        report: &Report,
        result: &SessionResult,
        completed_at: DateTime<Local>,
    ) -> Result<PathBuf, ExperimentError> {
        let path = self.path_for(&completed_at);
        let record = SessionRecord {
            completed_at: completed_at.to_rfc3339(),
            report,
            trials: &result.trials,
        };
        let body = serde_json::to_vec_pretty(&record)?;
        write_file(&path, &body)?;

        info!(path = %path.display(), "Result record written");
        Ok(path)
    }
}

fn write_file(path: &Path, body: &[u8]) -> Result<(), ExperimentError> {
    std::fs::write(path, body).map_err(|source| ExperimentError::Record {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::score;
    use chrono::NaiveDate;
    use reflex_core::{ChannelId, TrialOutcome};

    fn session() -> SessionResult {
        let mut result = SessionResult::default();
        for (trial, outcome) in [TrialOutcome::Hit { latency_ms: 230 }, TrialOutcome::Miss]
            .into_iter()
            .enumerate()
        {
            result.push(TrialRecord {
                trial,
                channel: ChannelId(1),
                wait_ms: 1200,
                outcome,
                samples: 10,
            });
        }
        result
    }

    #[test]
    fn file_name_is_unpadded_timestamp() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 6)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap();
        assert_eq!(
            record_file_name(RECORD_PREFIX, &at, RECORD_EXTENSION),
            "proj1-2026-10-6T9_5_3.json"
        );
    }

    #[test]
    fn file_name_two_digit_fields() {
        let at = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        assert_eq!(
            record_file_name("proj1", &at, "json"),
            "proj1-2025-12-31T23_59_58.json"
        );
    }

    #[test]
    fn writes_report_and_trials() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path());
        let result = session();
        let report = score(&result).unwrap();

        let path = writer.write(&report, &result, Local::now()).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("proj1-") && name.ends_with(".json"), "{name}");
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["report"]["miss_count"], 1);
        assert_eq!(json["report"]["total_count"], 2);
        assert_eq!(json["report"]["hits"], serde_json::json!([230]));
        assert_eq!(json["trials"][1]["outcome"]["kind"], "miss");
        assert!(json["completed_at"].is_string());
    }

    #[test]
    fn missing_directory_is_record_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("absent"));
        let result = session();
        let report = score(&result).unwrap();

        let err = writer.write(&report, &result, Local::now()).unwrap_err();
        assert!(matches!(err, ExperimentError::Record { .. }));
    }
}
