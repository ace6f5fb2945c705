use crate::config::{ChannelPlan, ExperimentConfig};
use crate::error::ExperimentError;
use crate::scheduler::IntervalScheduler;
use crate::trial::TrialRunner;
use reflex_core::{InputChannel, SessionResult, SignalIndicator, TrialOutcome, TrialRecord};
use reflex_timing::Clock;
use std::time::Duration;
use tracing::{error, info, trace};

/// Runs every channel plan in order, one trial at a time.
pub struct SessionRunner<C, L, S>
where
    C: Clock,
    L: SignalIndicator,
    S: IntervalScheduler,
{
    pub config: ExperimentConfig,
    pub clock: C,
    pub indicator: L,
    pub scheduler: S,
    /// Trials finished before the last run failed.
    partial: SessionResult,
}

impl<C, L, S> SessionRunner<C, L, S>
where
    C: Clock,
    L: SignalIndicator,
    S: IntervalScheduler,
{
    pub fn new(config: ExperimentConfig, clock: C, indicator: L, scheduler: S) -> Self {
        Self {
            config,
            clock,
            indicator,
            scheduler,
            partial: SessionResult::default(),
        }
    }

    /// Trials completed before the most recent [`run`](Self::run) failed.
    /// Empty after a successful run.
    pub fn partial(&self) -> &SessionResult {
        &self.partial
    }

    /// Pulses the start marker, runs each plan's trials on its channel, and
    /// pulses the end marker. Plans are separated by the between marker.
    ///
    /// # Errors
    /// [`ExperimentError::UnknownChannel`] before any indicator activity when
    /// a plan with trials names a channel missing from `channels`;
    /// [`ExperimentError::Hardware`] when a line fails mid-session.
    pub fn run<I: InputChannel>(
        &mut self,
        channels: &mut [I],
    ) -> Result<SessionResult, ExperimentError> {
        let lanes = self.resolve(channels)?;
        let total = self.config.total_trials();
        info!(trials = total, plans = lanes.len(), "Session starting");

        self.partial = SessionResult::default();
        let mut result = SessionResult::default();
        if let Err(e) = self.run_plans(channels, &lanes, &mut result) {
            let outcomes: Vec<_> = result.outcomes().collect();
            error!(
                error = %e,
                completed = result.len(),
                total,
                ?outcomes,
                "Session aborted"
            );
            self.partial = result;
            return Err(e);
        }
        info!(trials = result.len(), "Session complete");
        Ok(result)
    }

    fn run_plans<I: InputChannel>(
        &mut self,
        channels: &mut [I],
        lanes: &[(ChannelPlan, Option<usize>)],
        result: &mut SessionResult,
    ) -> Result<(), ExperimentError> {
        self.pulse(self.config.signals.start_pulses)?;

        for (i, (plan, lane)) in lanes.iter().enumerate() {
            if i > 0 {
                self.pulse(self.config.signals.between_pulses)?;
            }
            let Some(lane) = *lane else { continue };

            for _ in 0..plan.trial_count {
                let run = TrialRunner::new(&self.config.trial, &self.clock, &mut self.indicator)
                    .run(&mut self.scheduler, &mut channels[lane])?;

                let trial = result.len();
                match run.outcome {
                    TrialOutcome::Hit { latency_ms } => info!(
                        trial,
                        channel = %plan.channel,
                        wait_ms = run.wait_ms,
                        latency_ms,
                        "Hit"
                    ),
                    TrialOutcome::Miss => info!(
                        trial,
                        channel = %plan.channel,
                        wait_ms = run.wait_ms,
                        "Miss"
                    ),
                }
                result.push(TrialRecord {
                    trial,
                    channel: plan.channel,
                    wait_ms: run.wait_ms,
                    outcome: run.outcome,
                    samples: run.poll.samples,
                });
            }
        }

        self.pulse(self.config.signals.end_pulses)?;
        Ok(())
    }

    /// Maps each plan to the index of its channel. Plans without trials need
    /// no wiring.
    fn resolve<I: InputChannel>(
        &self,
        channels: &[I],
    ) -> Result<Vec<(ChannelPlan, Option<usize>)>, ExperimentError> {
        self.config
            .plans
            .iter()
            .map(|plan| {
                let lane = channels.iter().position(|c| c.id() == plan.channel);
                match lane {
                    None if plan.trial_count > 0 => {
                        Err(ExperimentError::UnknownChannel(plan.channel))
                    }
                    _ => Ok((*plan, lane)),
                }
            })
            .collect()
    }

    /// Human-facing marker. Not a trial and not timed.
    fn pulse(&mut self, count: usize) -> Result<(), ExperimentError> {
        let on = Duration::from_millis(self.config.signals.pulse_on_ms);
        let off = Duration::from_millis(self.config.signals.pulse_off_ms);
        trace!(count, "Signal pulses");
        for _ in 0..count {
            self.indicator.set_high()?;
            self.clock.sleep(on);
            self.indicator.set_low()?;
            self.clock.sleep(off);
        }
        Ok(())
    }
}
