pub mod sim;
pub mod timer;

pub use sim::SimClock;
pub use timer::{Clock, MonotonicClock, Tick};
