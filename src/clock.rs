//! Time sources and cancellation for the polling loops.
//!
//! Every suspension point in the crate (waiting for an mdoc file to go quiet,
//! waiting for the micrograph source to grow, the controller's poll interval)
//! goes through a [`Clock`]. Production code uses [`SystemClock`]; tests and
//! simulations use [`ManualClock`], whose `sleep` advances virtual time
//! instantly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Source of wall-clock time and blocking sleeps.
///
/// Wall-clock time (not `Instant`) is required because elapsed times are
/// measured against file modification times.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real time, real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for deterministic tests.
///
/// `sleep` returns immediately after advancing the clock by the requested
/// duration. The clock is shared between threads, so concurrent sleepers all
/// push the same timeline forward.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Create a clock frozen at the current system time.
    pub fn starting_now() -> Self {
        Self::new(SystemTime::now())
    }

    /// Move the clock forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += duration;
    }

    /// Every duration passed to [`Clock::sleep`] so far, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
        // Let worker threads observe the new time before the caller races ahead.
        std::thread::yield_now();
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Time elapsed between `earlier` and `now`, clamped to zero when `earlier`
/// lies in the future (clock skew on network filesystems).
pub fn elapsed_between(earlier: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(earlier).unwrap_or(Duration::ZERO)
}

/// Cooperative stop flag shared between the caller and the stream loops.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle that has not been triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that every loop observing this handle stops at its next check.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_time() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = ManualClock::new(start);

        clock.sleep(Duration::from_secs(90));
        clock.sleep(Duration::from_secs(12));

        assert_eq!(clock.now(), start + Duration::from_secs(102));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(90), Duration::from_secs(12)]
        );
    }

    #[test]
    fn test_advance_is_not_recorded_as_sleep() {
        let clock = ManualClock::starting_now();
        let before = clock.now();
        clock.advance(Duration::from_secs(5));

        assert_eq!(elapsed_between(before, clock.now()), Duration::from_secs(5));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_elapsed_clamps_future_timestamps() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let future = now + Duration::from_secs(60);
        assert_eq!(elapsed_between(future, now), Duration::ZERO);
    }

    #[test]
    fn test_stop_handle_is_shared_between_clones() {
        let handle = StopHandle::new();
        let other = handle.clone();
        assert!(!other.is_stopped());

        handle.stop();
        assert!(other.is_stopped());
    }
}
