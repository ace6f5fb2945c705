//! Deterministic stand-ins for the LED, the buttons and the human.
//!
//! A [`SimBench`] ties a [`SimClock`] to one simulated indicator line and any
//! number of simulated inputs. Each input sample costs `sample_cost_ms` of
//! simulated time, so a polling loop makes progress without a real clock.

use reflex_core::{ChannelId, InputChannel, Level, Polarity, SignalIndicator};
use reflex_timing::{SimClock, Tick};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
struct LineState {
    on: bool,
    on_since: Option<Tick>,
    /// Incremented on every off→on transition.
    generation: u64,
    set_high_calls: u32,
    set_low_calls: u32,
}

/// How the simulated subject answers each stimulus
#[derive(Debug, Clone)]
pub enum Responder {
    /// Presses `n` ms after every onset.
    After(u32),
    Never,
    /// One entry per stimulus: `Some(n)` presses after `n` ms, `None` misses.
    /// Misses once the script runs out.
    Script(VecDeque<Option<u32>>),
    /// Every sample fails with an I/O error.
    Broken,
}

#[derive(Debug, Clone)]
pub struct SimBench {
    clock: SimClock,
    line: Rc<RefCell<LineState>>,
}

impl SimBench {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            line: Rc::default(),
        }
    }

    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    pub fn indicator(&self) -> SimIndicator {
        SimIndicator {
            clock: self.clock.clone(),
            line: Rc::clone(&self.line),
        }
    }

    pub fn channel(&self, id: ChannelId, responder: Responder) -> SimChannel {
        SimChannel {
            id,
            polarity: Polarity::ActiveLow,
            responder,
            sample_cost_ms: 1,
            seen_generation: 0,
            pending: None,
            reads: 0,
            clock: self.clock.clone(),
            line: Rc::clone(&self.line),
        }
    }

    pub fn indicator_on(&self) -> bool {
        self.line.borrow().on
    }

    pub fn set_high_calls(&self) -> u32 {
        self.line.borrow().set_high_calls
    }

    pub fn set_low_calls(&self) -> u32 {
        self.line.borrow().set_low_calls
    }
}

#[derive(Debug)]
pub struct SimIndicator {
    clock: SimClock,
    line: Rc<RefCell<LineState>>,
}

impl SignalIndicator for SimIndicator {
    fn set_high(&mut self) -> io::Result<()> {
        let mut line = self.line.borrow_mut();
        line.set_high_calls += 1;
        if !line.on {
            line.on = true;
            line.on_since = Some(self.clock.peek());
            line.generation += 1;
        }
        Ok(())
    }

    fn set_low(&mut self) -> io::Result<()> {
        let mut line = self.line.borrow_mut();
        line.set_low_calls += 1;
        line.on = false;
        line.on_since = None;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SimChannel {
    id: ChannelId,
    polarity: Polarity,
    responder: Responder,
    sample_cost_ms: u32,
    seen_generation: u64,
    pending: Option<u32>,
    reads: u64,
    clock: SimClock,
    line: Rc<RefCell<LineState>>,
}

impl SimChannel {
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_sample_cost(mut self, ms: u32) -> Self {
        self.sample_cost_ms = ms;
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn latency_for(&mut self, generation: u64) -> io::Result<Option<u32>> {
        match &mut self.responder {
            Responder::After(ms) => Ok(Some(*ms)),
            Responder::Never => Ok(None),
            Responder::Broken => Err(io::Error::other("input line disconnected")),
            Responder::Script(script) => {
                if generation != self.seen_generation {
                    self.seen_generation = generation;
                    self.pending = script.pop_front().flatten();
                }
                Ok(self.pending)
            }
        }
    }
}

impl InputChannel for SimChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn read(&mut self) -> io::Result<Level> {
        self.reads += 1;
        let (on_since, generation) = {
            let line = self.line.borrow();
            (line.on_since.filter(|_| line.on), line.generation)
        };

        let pressed = match on_since {
            Some(onset) => {
                let elapsed = self.clock.peek().since(onset);
                self.latency_for(generation)?
                    .is_some_and(|latency| elapsed >= latency)
            }
            None => false,
        };
        self.clock.advance(self.sample_cost_ms);

        let active = self.polarity.active_level();
        Ok(if pressed {
            active
        } else {
            match active {
                Level::Low => Level::High,
                Level::High => Level::Low,
            }
        })
    }
}
