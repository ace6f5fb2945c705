use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Sampled logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

/// Which level of an input line counts as "the user responded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Triggered when the line is pulled low (button to ground with pull-up).
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    pub fn active_level(&self) -> Level {
        match self {
            Polarity::ActiveLow => Level::Low,
            Polarity::ActiveHigh => Level::High,
        }
    }

    pub fn is_active(&self, level: Level) -> bool {
        level == self.active_level()
    }
}

/// Identifies one response input, e.g. `ChannelId(1)` for the first button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u8);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input{}", self.0)
    }
}

/// Binary output line driving the stimulus light.
pub trait SignalIndicator {
    fn set_high(&mut self) -> io::Result<()>;
    fn set_low(&mut self) -> io::Result<()>;
}

/// Binary input line with a declared active polarity.
pub trait InputChannel {
    fn id(&self) -> ChannelId;
    fn polarity(&self) -> Polarity;
    fn read(&mut self) -> io::Result<Level>;

    /// Samples the line once and reports whether it sits at its active level.
    fn is_triggered(&mut self) -> io::Result<bool> {
        let level = self.read()?;
        Ok(self.polarity().is_active(level))
    }
}

impl<T: SignalIndicator + ?Sized> SignalIndicator for Box<T> {
    fn set_high(&mut self) -> io::Result<()> {
        (**self).set_high()
    }
    fn set_low(&mut self) -> io::Result<()> {
        (**self).set_low()
    }
}

impl<T: InputChannel + ?Sized> InputChannel for Box<T> {
    fn id(&self) -> ChannelId {
        (**self).id()
    }
    fn polarity(&self) -> Polarity {
        (**self).polarity()
    }
    fn read(&mut self) -> io::Result<Level> {
        (**self).read()
    }
}
