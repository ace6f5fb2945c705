use crate::io::ChannelId;
use serde::{Deserialize, Serialize};

/// Outcome of a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialOutcome {
    /// Input triggered `latency_ms` after stimulus onset.
    Hit { latency_ms: u32 },
    /// Stimulus window closed without a trigger.
    Miss,
}

impl TrialOutcome {
    pub fn latency_ms(&self) -> Option<u32> {
        match self {
            TrialOutcome::Hit { latency_ms } => Some(*latency_ms),
            TrialOutcome::Miss => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, TrialOutcome::Hit { .. })
    }
}

/// Trial state machine. Only `Armed` checks elapsed time against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Pre-stimulus wait, indicator off, input not sampled.
    Waiting { wait_ms: u32 },
    /// Indicator on since the recorded onset tick; input is being polled.
    Armed,
    Complete(TrialOutcome),
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub channel: ChannelId,
    pub wait_ms: u32,
    pub outcome: TrialOutcome,
    /// Input samples taken while armed.
    pub samples: u64,
}

/// Every trial of a session, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub trials: Vec<TrialRecord>,
}

impl SessionResult {
    pub fn push(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = TrialOutcome> + '_ {
        self.trials.iter().map(|t| t.outcome)
    }
}
