use reflex_core::{SessionResult, TrialOutcome};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

/// Every trial missed, so there is nothing to average.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no responses to score: missed {misses} of {total} stimuli")]
pub struct NoHitsError {
    pub misses: usize,
    pub total: usize,
}

/// Summary of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub miss_count: usize,
    pub total_count: usize,
    /// Hit latencies in trial order.
    pub hits: Vec<u32>,
    pub average_ms: f64,
    pub min_ms: u32,
    pub max_ms: u32,
    /// Fraction of stimuli answered, in `[0, 1]`.
    pub score: f64,
    pub score_text: String,
}

pub fn score(result: &SessionResult) -> Result<Report, NoHitsError> {
    score_outcomes(result.outcomes())
}

/// Reduces outcomes to a [`Report`].
///
/// # Errors
/// [`NoHitsError`] when no outcome is a hit, including an empty session.
pub fn score_outcomes<I>(outcomes: I) -> Result<Report, NoHitsError>
where
    I: IntoIterator<Item = TrialOutcome>,
{
    let mut total_count = 0;
    let mut hits = Vec::new();
    for outcome in outcomes {
        total_count += 1;
        if let Some(latency) = outcome.latency_ms() {
            hits.push(latency);
        }
    }
    let miss_count = total_count - hits.len();

    let (Some(&min_ms), Some(&max_ms)) = (hits.iter().min(), hits.iter().max()) else {
        return Err(NoHitsError {
            misses: miss_count,
            total: total_count,
        });
    };
    let average_ms = hits.iter().map(|&h| f64::from(h)).sum::<f64>() / hits.len() as f64;
    let score = hits.len() as f64 / total_count as f64;

    let mut score_text = String::new();
    let _ = writeln!(score_text, "You missed the light {miss_count} / {total_count} times");
    let _ = writeln!(score_text, "The average response time is {average_ms:.1} ms");
    let _ = writeln!(score_text, "The minimum response time is {min_ms} ms");
    let _ = writeln!(score_text, "The maximum response time is {max_ms} ms");
    let _ = write!(
        score_text,
        "Misses v. total light flashes: {miss_count} v. {total_count} (score {score:.2})"
    );

    Ok(Report {
        miss_count,
        total_count,
        hits,
        average_ms,
        min_ms,
        max_ms,
        score,
        score_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_core::TrialOutcome::{Hit, Miss};

    #[test]
    fn mixed_session() {
        let report = score_outcomes([
            Hit { latency_ms: 300 },
            Miss,
            Hit { latency_ms: 200 },
            Hit { latency_ms: 250 },
        ])
        .unwrap();

        assert_eq!(report.total_count, 4);
        assert_eq!(report.miss_count, 1);
        assert_eq!(report.hits, vec![300, 200, 250]);
        assert_eq!(report.average_ms, 250.0);
        assert_eq!(report.min_ms, 200);
        assert_eq!(report.max_ms, 300);
        assert_eq!(report.score, 0.75);
        assert_eq!(report.miss_count + report.hits.len(), report.total_count);
    }

    #[test]
    fn all_misses_is_an_error_not_zero() {
        let err = score_outcomes([Miss; 5]).unwrap_err();
        assert_eq!(err, NoHitsError { misses: 5, total: 5 });
    }

    #[test]
    fn empty_session_is_an_error() {
        let err = score_outcomes(std::iter::empty()).unwrap_err();
        assert_eq!(err, NoHitsError { misses: 0, total: 0 });
    }

    #[test]
    fn zero_latency_hit_counts() {
        let report = score_outcomes([Hit { latency_ms: 0 }, Miss]).unwrap();
        assert_eq!(report.hits, vec![0]);
        assert_eq!(report.miss_count, 1);
        assert_eq!(report.average_ms, 0.0);
    }

    #[test]
    fn fractional_average() {
        let report = score_outcomes([Hit { latency_ms: 1 }, Hit { latency_ms: 2 }]).unwrap();
        assert_eq!(report.average_ms, 1.5);
        assert!(report.score_text.contains("average response time is 1.5 ms"));
    }

    #[test]
    fn score_text_carries_every_figure() {
        let report = score_outcomes([
            Hit { latency_ms: 180 },
            Miss,
            Hit { latency_ms: 420 },
        ])
        .unwrap();
        let text = &report.score_text;

        assert!(text.contains("missed the light 1 / 3 times"), "{text}");
        assert!(text.contains("300.0 ms"), "{text}");
        assert!(text.contains("minimum response time is 180 ms"), "{text}");
        assert!(text.contains("maximum response time is 420 ms"), "{text}");
        assert!(text.contains("1 v. 3"), "{text}");
    }
}
