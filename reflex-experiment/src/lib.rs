pub mod config;
pub mod error;
pub mod record;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod sim;
pub mod trial;

pub use config::{ChannelPlan, ConfigError, ExperimentConfig, SignalPattern, TrialConfig};
pub use error::ExperimentError;
pub use record::{ResultWriter, record_file_name};
pub use scheduler::{IntervalScheduler, ScriptedScheduler, UniformScheduler};
pub use score::{NoHitsError, Report, score, score_outcomes};
pub use session::SessionRunner;
pub use trial::{PollStats, TrialRun, TrialRunner};
