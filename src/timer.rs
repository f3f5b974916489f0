//! Interval timing for the sampling host loop.
//!
//! [`IntervalTimer`] wraps a fixed polling interval and tracks elapsed time
//! against a monotonic clock. Three polling disciplines are provided and they
//! are not interchangeable: `poll_once` for coarse one-shot triggers where
//! skipped ticks are harmless, `poll_catch_up` for periodic work that must run
//! a bounded, correct number of times even when the host loop stalls, and
//! `poll_phase` for a continuous sawtooth signal that stays smooth at any
//! host poll rate.

use once_cell::sync::Lazy;
use std::time::{Duration, Instant};
use tracing::trace;

/// Monotonic instant captured the first time any timer code runs, used as
/// the process-wide start reference for uptime reporting.
pub static PROGRAM_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Callback invoked by the polling operations. The payload depends on the
/// discipline: elapsed milliseconds for `poll_once`, one full interval in
/// milliseconds per fire for `poll_catch_up`, and the normalized phase in
/// [0, 1) for `poll_phase`.
pub type TimerCallback = Box<dyn FnMut(f32)>;

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("timer interval must be a positive number of milliseconds")]
    ZeroInterval,
}

/// Stateful fixed-interval timer over a monotonic clock.
pub struct IntervalTimer {
    interval: Duration,
    last_reset: Instant,
    callback: Option<TimerCallback>,
}

impl IntervalTimer {
    /// Creates a timer with no callback. The interval is immutable afterwards.
    ///
    /// Durations are integral milliseconds internally, so the interval must
    /// be at least one millisecond (the phase computation divides by it).
    pub fn new(interval: Duration) -> Result<Self, TimerError> {
        if interval.as_millis() == 0 {
            return Err(TimerError::ZeroInterval);
        }
        Ok(Self {
            interval,
            last_reset: Instant::now(),
            callback: None,
        })
    }

    /// Creates a timer that invokes `callback` from the polling operations.
    pub fn with_callback(
        interval: Duration,
        callback: impl FnMut(f32) + 'static,
    ) -> Result<Self, TimerError> {
        let mut timer = Self::new(interval)?;
        timer.callback = Some(Box::new(callback));
        Ok(timer)
    }

    /// The fixed interval this timer was constructed with.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Raw time since the last reset. No side effects.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Raw elapsed time in whole milliseconds. No side effects.
    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Moves the reset point to now without invoking the callback.
    pub fn reset(&mut self) {
        self.last_reset = Instant::now();
    }

    /// Fires the callback at most once if at least one interval has elapsed,
    /// then resets the timer. Catch-up cycles beyond the first are dropped.
    /// Returns whether the timer fired.
    pub fn poll_once(&mut self) -> bool {
        self.poll_once_at(Instant::now())
    }

    /// Fires the callback once per fully elapsed interval, with the interval
    /// length as payload. The reset point advances by exactly the consumed
    /// whole intervals, so sub-interval residue keeps accumulating toward the
    /// next tick and no tick is ever silently dropped. Returns the fire count.
    pub fn poll_catch_up(&mut self) -> u32 {
        self.poll_catch_up_at(Instant::now())
    }

    /// Computes the normalized position within the current interval and fires
    /// the callback with it on every call. Never resets: this is a continuous,
    /// non-consuming sawtooth in [0, 1). Returns the phase.
    pub fn poll_phase(&mut self) -> f32 {
        self.poll_phase_at(Instant::now())
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_reset)
    }

    fn poll_once_at(&mut self, now: Instant) -> bool {
        let elapsed = self.elapsed_at(now);
        if elapsed < self.interval {
            return false;
        }
        self.fire(elapsed.as_millis() as f32);
        self.last_reset = now;
        true
    }

    fn poll_catch_up_at(&mut self, now: Instant) -> u32 {
        let interval_millis = self.interval.as_millis() as f32;
        let mut remaining = self.elapsed_at(now);
        let mut fired = 0u32;
        while remaining >= self.interval {
            self.fire(interval_millis);
            remaining -= self.interval;
            fired += 1;
        }
        if fired > 0 {
            self.last_reset += self.interval * fired;
        }
        fired
    }

    fn poll_phase_at(&mut self, now: Instant) -> f32 {
        let elapsed_millis = self.elapsed_at(now).as_millis() as u64;
        let interval_millis = self.interval.as_millis() as u64;
        let phase = (elapsed_millis % interval_millis) as f32 / interval_millis as f32;
        self.fire(phase);
        phase
    }

    fn fire(&mut self, payload: f32) {
        trace!(payload, "timer fired");
        if let Some(callback) = self.callback.as_mut() {
            callback(payload);
        }
    }
}
