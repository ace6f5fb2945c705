pub mod io;
pub mod trial;

pub use io::{ChannelId, InputChannel, Level, Polarity, SignalIndicator};
pub use trial::{SessionResult, TrialOutcome, TrialRecord, TrialState};
