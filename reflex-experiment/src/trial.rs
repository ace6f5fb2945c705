use crate::config::TrialConfig;
use crate::error::ExperimentError;
use crate::scheduler::IntervalScheduler;
use reflex_core::{InputChannel, SignalIndicator, TrialOutcome, TrialState};
use reflex_timing::{Clock, Tick};
use std::io;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Sampling cadence observed while armed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub samples: u64,
    /// Largest gap between consecutive window checks, in ms.
    pub max_gap_ms: u32,
}

impl PollStats {
    fn count_sample(&mut self) {
        self.samples = self.samples.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialRun {
    pub outcome: TrialOutcome,
    pub wait_ms: u32,
    pub poll: PollStats,
}

/// Runs one stimulus/response cycle: `Waiting -> Armed -> Complete`.
///
/// Every poll iteration checks the window before sampling the input, so a
/// press seen at or after `stimulus_window_ms` is a miss and a hit latency is
/// always below the window. The indicator is off whenever `run` returns,
/// including on error.
pub struct TrialRunner<'a, C: Clock, L: SignalIndicator> {
    config: &'a TrialConfig,
    clock: &'a C,
    indicator: &'a mut L,
    state: TrialState,
}

impl<'a, C: Clock, L: SignalIndicator> TrialRunner<'a, C, L> {
    pub fn new(config: &'a TrialConfig, clock: &'a C, indicator: &'a mut L) -> Self {
        Self {
            config,
            clock,
            indicator,
            state: TrialState::Waiting { wait_ms: 0 },
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn run<S, I>(
        &mut self,
        scheduler: &mut S,
        channel: &mut I,
    ) -> Result<TrialRun, ExperimentError>
    where
        S: IntervalScheduler + ?Sized,
        I: InputChannel + ?Sized,
    {
        let wait_ms = self.wait(scheduler);
        let (outcome, poll) = self.armed(channel)?;
        self.state = TrialState::Complete(outcome);

        Ok(TrialRun {
            outcome,
            wait_ms,
            poll,
        })
    }

    fn wait<S: IntervalScheduler + ?Sized>(&mut self, scheduler: &mut S) -> u32 {
        let wait_s = scheduler.next_wait(self.config.wait_min_s, self.config.wait_max_s);
        let wait = Duration::try_from_secs_f64(wait_s).unwrap_or_else(|_| {
            warn!(wait_s, "Scheduler returned an unusable wait, skipping it");
            Duration::ZERO
        });
        let wait_ms = wait.as_millis().min(u32::MAX as u128) as u32;

        self.state = TrialState::Waiting { wait_ms };
        trace!(wait_ms, "Waiting before stimulus");
        self.clock.sleep(wait);
        wait_ms
    }

    fn armed<I: InputChannel + ?Sized>(
        &mut self,
        channel: &mut I,
    ) -> Result<(TrialOutcome, PollStats), ExperimentError> {
        if let Err(e) = self.indicator.set_high() {
            if let Err(off) = self.indicator.set_low() {
                warn!(error = %off, "Indicator may be stuck on");
            }
            return Err(e.into());
        }
        let onset = self.clock.now();
        self.state = TrialState::Armed;
        trace!(onset = onset.0, "Stimulus on");

        let polled = self.poll(channel, onset);
        let off = self.indicator.set_low();
        let (outcome, stats) = polled?;
        off?;

        debug!(
            samples = stats.samples,
            max_gap_ms = stats.max_gap_ms,
            "Poll cadence"
        );
        if f64::from(stats.max_gap_ms) > self.config.sample_period_ms {
            warn!(
                max_gap_ms = stats.max_gap_ms,
                sample_period_ms = self.config.sample_period_ms,
                "Input sampled slower than the configured period"
            );
        }
        Ok((outcome, stats))
    }

    fn poll<I: InputChannel + ?Sized>(
        &mut self,
        channel: &mut I,
        onset: Tick,
    ) -> io::Result<(TrialOutcome, PollStats)> {
        let window = self.config.stimulus_window_ms;
        let mut stats = PollStats::default();
        let mut last = 0;

        loop {
            let elapsed = self.clock.elapsed_ms(onset);
            stats.max_gap_ms = stats.max_gap_ms.max(elapsed.saturating_sub(last));
            last = elapsed;

            if elapsed >= window {
                return Ok((TrialOutcome::Miss, stats));
            }
            stats.count_sample();
            if channel.is_triggered()? {
                return Ok((TrialOutcome::Hit { latency_ms: elapsed }, stats));
            }
            std::hint::spin_loop();
        }
    }
}
