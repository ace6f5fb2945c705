use std::time::{Duration, Instant};

/// Reading of a free-running millisecond counter.
///
/// The counter is 32 bits wide and wraps; compare ticks only through
/// [`Tick::since`], never by subtracting the raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick(pub u32);

impl Tick {
    /// Milliseconds from `earlier` to `self`, correct across one wraparound.
    pub fn since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    pub fn diff(later: Tick, earlier: Tick) -> u32 {
        later.since(earlier)
    }
}

/// Monotonic millisecond clock with a blocking sleep
pub trait Clock {
    fn now(&self) -> Tick;
    fn sleep(&self, d: Duration);

    fn elapsed_ms(&self, since: Tick) -> u32 {
        self.now().since(since)
    }
}

/// Host clock backed by [`Instant`], with an OS-level precise sleep.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    pub start: Instant,
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        // truncation to u32 is the wraparound
        Tick(self.start.elapsed().as_millis() as u32)
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // resume with the remainder when a signal interrupts the sleep
        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            if rc != EINTR {
                break;
            }
            req = rem;
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
