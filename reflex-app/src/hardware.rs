//! Indicator and button wiring for the binary.
//!
//! `sysfs` drives real lines through the Linux GPIO sysfs interface.
//! `simulated` lights a virtual LED and answers with virtual buttons after a
//! random human-like delay, so a session can run on any host.

use anyhow::{Context, Result, bail};
use rand::Rng;
use reflex_core::{ChannelId, InputChannel, Level, Polarity, SignalIndicator};
use serde::Deserialize;
use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Sysfs,
    #[default]
    Simulated,
}

/// Optional `hardware` section of the parameter file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub backend: Backend,
    pub gpio_root: PathBuf,
    pub led: u32,
    pub button1: u32,
    pub button2: u32,
    /// Simulated response delay range, ms.
    pub latency_ms: (u32, u32),
    /// Probability that the simulated subject ignores a stimulus.
    pub miss_rate: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gpio_root: PathBuf::from("/sys/class/gpio"),
            led: 25,
            button1: 16,
            button2: 20,
            latency_ms: (150, 400),
            miss_rate: 0.1,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParamFile {
    #[serde(default)]
    hardware: HardwareConfig,
}

/// Indicator plus one input per channel, ready for a session.
pub struct Rig {
    pub indicator: Box<dyn SignalIndicator>,
    pub channels: Vec<Box<dyn InputChannel>>,
}

impl HardwareConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot open parameter file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid hardware section in {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: ParamFile = serde_json::from_str(content)?;
        let hw = file.hardware;
        if hw.latency_ms.0 > hw.latency_ms.1 {
            bail!(
                "latency_ms range is inverted: [{}, {}]",
                hw.latency_ms.0,
                hw.latency_ms.1
            );
        }
        if !(0.0..=1.0).contains(&hw.miss_rate) {
            bail!("miss_rate must lie in [0, 1], got {}", hw.miss_rate);
        }
        Ok(hw)
    }

    pub fn build(&self) -> Result<Rig> {
        match self.backend {
            Backend::Sysfs => self.build_sysfs(),
            Backend::Simulated => Ok(self.build_simulated()),
        }
    }

    fn build_sysfs(&self) -> Result<Rig> {
        info!(
            root = %self.gpio_root.display(),
            led = self.led,
            button1 = self.button1,
            button2 = self.button2,
            "Using sysfs GPIO"
        );
        let led = SysfsOutput::open(&self.gpio_root, self.led)
            .with_context(|| format!("Cannot set up LED on GPIO {}", self.led))?;
        let mut channels: Vec<Box<dyn InputChannel>> = Vec::new();
        for (id, pin) in [(ChannelId(1), self.button1), (ChannelId(2), self.button2)] {
            let input = SysfsInput::open(&self.gpio_root, pin, id, Polarity::ActiveLow)
                .with_context(|| format!("Cannot set up {id} on GPIO {pin}"))?;
            channels.push(Box::new(input));
        }
        Ok(Rig {
            indicator: Box::new(led),
            channels,
        })
    }

    fn build_simulated(&self) -> Rig {
        info!(
            latency_ms = ?self.latency_ms,
            miss_rate = self.miss_rate,
            "Using simulated LED and buttons"
        );
        let onset = Rc::new(Cell::new(None));
        let channels: Vec<Box<dyn InputChannel>> = [ChannelId(1), ChannelId(2)]
            .into_iter()
            .map(|id| {
                Box::new(VirtualButton::new(
                    id,
                    Rc::clone(&onset),
                    self.latency_ms,
                    self.miss_rate,
                    rand::rng(),
                )) as Box<dyn InputChannel>
            })
            .collect();
        Rig {
            indicator: Box::new(VirtualLed { onset }),
            channels,
        }
    }
}

// ── sysfs GPIO ───────────────────────────────────────────────────────────────

fn export(root: &Path, pin: u32, direction: &str) -> io::Result<PathBuf> {
    let dir = root.join(format!("gpio{pin}"));
    if !dir.exists() {
        debug!(pin, "Exporting GPIO");
        fs::write(root.join("export"), pin.to_string())?;
    }
    fs::write(dir.join("direction"), direction)?;
    Ok(dir.join("value"))
}

pub struct SysfsOutput {
    value: File,
}

impl SysfsOutput {
    pub fn open(root: &Path, pin: u32) -> io::Result<Self> {
        let path = export(root, pin, "out")?;
        let value = OpenOptions::new().write(true).open(path)?;
        Ok(Self { value })
    }

    fn write_level(&mut self, level: &[u8]) -> io::Result<()> {
        self.value.seek(SeekFrom::Start(0))?;
        self.value.write_all(level)?;
        self.value.flush()
    }
}

impl SignalIndicator for SysfsOutput {
    fn set_high(&mut self) -> io::Result<()> {
        self.write_level(b"1")
    }
    fn set_low(&mut self) -> io::Result<()> {
        self.write_level(b"0")
    }
}

pub struct SysfsInput {
    id: ChannelId,
    polarity: Polarity,
    value: File,
}

impl SysfsInput {
    pub fn open(root: &Path, pin: u32, id: ChannelId, polarity: Polarity) -> io::Result<Self> {
        let path = export(root, pin, "in")?;
        let value = File::open(path)?;
        Ok(Self {
            id,
            polarity,
            value,
        })
    }
}

impl InputChannel for SysfsInput {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn read(&mut self) -> io::Result<Level> {
        let mut buf = [0u8; 1];
        self.value.seek(SeekFrom::Start(0))?;
        self.value.read_exact(&mut buf)?;
        match buf[0] {
            b'0' => Ok(Level::Low),
            b'1' => Ok(Level::High),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected GPIO value byte {other:#04x}"),
            )),
        }
    }
}

// ── simulated ────────────────────────────────────────────────────────────────

pub struct VirtualLed {
    onset: Rc<Cell<Option<Instant>>>,
}

impl SignalIndicator for VirtualLed {
    fn set_high(&mut self) -> io::Result<()> {
        if self.onset.get().is_none() {
            self.onset.set(Some(Instant::now()));
        }
        trace!("LED on");
        Ok(())
    }

    fn set_low(&mut self) -> io::Result<()> {
        self.onset.set(None);
        trace!("LED off");
        Ok(())
    }
}

/// Active-low button pressed by a virtual subject.
pub struct VirtualButton<R: Rng> {
    id: ChannelId,
    onset: Rc<Cell<Option<Instant>>>,
    latency_ms: (u32, u32),
    miss_rate: f64,
    rng: R,
    /// Onset being answered and the drawn delay, `None` for a miss.
    answering: Option<(Instant, Option<Duration>)>,
}

impl<R: Rng> VirtualButton<R> {
    pub fn new(
        id: ChannelId,
        onset: Rc<Cell<Option<Instant>>>,
        latency_ms: (u32, u32),
        miss_rate: f64,
        rng: R,
    ) -> Self {
        Self {
            id,
            onset,
            latency_ms,
            miss_rate,
            rng,
            answering: None,
        }
    }

    fn delay_for(&mut self, onset: Instant) -> Option<Duration> {
        match self.answering {
            Some((seen, delay)) if seen == onset => delay,
            _ => {
                let delay = if self.rng.random_bool(self.miss_rate) {
                    None
                } else {
                    let (lo, hi) = self.latency_ms;
                    Some(Duration::from_millis(u64::from(
                        self.rng.random_range(lo..=hi),
                    )))
                };
                self.answering = Some((onset, delay));
                delay
            }
        }
    }
}

impl<R: Rng> InputChannel for VirtualButton<R> {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn polarity(&self) -> Polarity {
        Polarity::ActiveLow
    }

    fn read(&mut self) -> io::Result<Level> {
        let pressed = match self.onset.get() {
            Some(onset) => self
                .delay_for(onset)
                .is_some_and(|delay| onset.elapsed() >= delay),
            None => false,
        };
        Ok(if pressed { Level::Low } else { Level::High })
    }
}
