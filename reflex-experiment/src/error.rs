use crate::config::ConfigError;
use crate::score::NoHitsError;
use reflex_core::ChannelId;
use std::path::PathBuf;
use thiserror::Error;

/// Session-level failures.
///
/// A failed record write never re-runs trials: the outcomes came from a
/// person and cannot be reproduced.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Indicator or input line failed to switch or sample.
    #[error("digital I/O failed: {0}")]
    Hardware(#[from] std::io::Error),

    #[error("no input wired for channel {0}")]
    UnknownChannel(ChannelId),

    #[error(transparent)]
    NoHits(#[from] NoHitsError),

    #[error("cannot write result record {}: {source}", .path.display())]
    Record {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot encode result record: {0}")]
    Encode(#[from] serde_json::Error),
}
