use rand::Rng;
use rand::rngs::ThreadRng;
use std::collections::VecDeque;

/// Source of pre-stimulus wait durations, in seconds.
///
/// Callers guarantee `min_s <= max_s`; implementations may panic otherwise.
pub trait IntervalScheduler {
    fn next_wait(&mut self, min_s: f64, max_s: f64) -> f64;
}

/// Uniform draw over `[min_s, max_s]` from an injected RNG
#[derive(Debug, Clone)]
pub struct UniformScheduler<R: Rng> {
    pub rng: R,
}

impl<R: Rng> UniformScheduler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl UniformScheduler<ThreadRng> {
    /// Seeded from the OS entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::rng())
    }
}

impl<R: Rng> IntervalScheduler for UniformScheduler<R> {
    fn next_wait(&mut self, min_s: f64, max_s: f64) -> f64 {
        if min_s == max_s {
            return min_s;
        }
        self.rng.random_range(min_s..=max_s)
    }
}

/// Replays a fixed list of waits, clamped into the requested bounds.
/// Falls back to `min_s` once the list is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScheduler {
    waits: VecDeque<f64>,
}

impl ScriptedScheduler {
    pub fn new(waits: impl IntoIterator<Item = f64>) -> Self {
        Self {
            waits: waits.into_iter().collect(),
        }
    }
}

impl IntervalScheduler for ScriptedScheduler {
    fn next_wait(&mut self, min_s: f64, max_s: f64) -> f64 {
        self.waits
            .pop_front()
            .map_or(min_s, |w| w.clamp(min_s, max_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_stays_within_bounds() {
        let mut sched = UniformScheduler::new(StdRng::seed_from_u64(7));
        let (lo, hi) = (0.5, 5.0);
        let draws: Vec<f64> = (0..20_000).map(|_| sched.next_wait(lo, hi)).collect();

        assert!(draws.iter().all(|w| (lo..=hi).contains(w)));
        // both halves of the interval get used
        assert!(draws.iter().any(|w| *w < 1.0));
        assert!(draws.iter().any(|w| *w > 4.5));
    }

    #[test]
    fn uniform_mean_is_centered() {
        let mut sched = UniformScheduler::new(StdRng::seed_from_u64(42));
        let n = 50_000;
        let mean = (0..n).map(|_| sched.next_wait(1.0, 3.0)).sum::<f64>() / n as f64;
        assert!((mean - 2.0).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn degenerate_interval_returns_bound() {
        let mut sched = UniformScheduler::from_entropy();
        assert_eq!(sched.next_wait(0.0, 0.0), 0.0);
        assert_eq!(sched.next_wait(2.5, 2.5), 2.5);
    }

    #[test]
    fn scripted_replays_then_falls_back() {
        let mut sched = ScriptedScheduler::new([1.0, 9.0, -1.0]);
        assert_eq!(sched.next_wait(0.5, 5.0), 1.0);
        assert_eq!(sched.next_wait(0.5, 5.0), 5.0);
        assert_eq!(sched.next_wait(0.5, 5.0), 0.5);
        assert_eq!(sched.next_wait(0.5, 5.0), 0.5);
    }
}
