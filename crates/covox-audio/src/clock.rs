//! Wall-clock to frame-index conversion.

use std::time::Instant;

/// Monotonic nanosecond time source.
///
/// Seam for the scheduler's timing so tests can drive the loop with a fake
/// clock. Implementations must be immune to wall-clock adjustment.
pub trait TimeSource: Send {
    /// Nanoseconds since an arbitrary fixed origin.
    fn now_ns(&self) -> u64;
}

/// Production time source backed by `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Maps elapsed time at a fixed sample rate onto a target frame index.
///
/// `start_ns` is captured once at playback start. Pausing freezes the
/// elapsed-time base: the nanoseconds spent paused are accumulated and
/// subtracted, so the resumed position equals the position at the moment of
/// pausing. Returned indices past the end of the buffer mean natural
/// end-of-playback, not an error.
#[derive(Debug)]
pub struct PlaybackClock {
    sample_rate: u32,
    start_ns: u64,
    paused_ns: u64,
    pause_started: Option<u64>,
}

impl PlaybackClock {
    pub const fn new(sample_rate: u32, start_ns: u64) -> Self {
        Self {
            sample_rate,
            start_ns,
            paused_ns: 0,
            pause_started: None,
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The frame that should be audible at `now_ns`:
    /// `floor(elapsed * sample_rate / 1e9)`, with paused time excluded.
    pub fn target_frame(&self, now_ns: u64) -> u64 {
        let base = self.start_ns.saturating_add(self.paused_ns);
        let elapsed = u128::from(now_ns.saturating_sub(base));
        (elapsed * u128::from(self.sample_rate) / NANOS_PER_SEC) as u64
    }

    /// Mark the start of a pause. Idempotent while already paused.
    pub fn pause(&mut self, now_ns: u64) {
        if self.pause_started.is_none() {
            self.pause_started = Some(now_ns);
        }
    }

    /// End a pause, folding its duration into the accumulated paused time.
    pub fn resume(&mut self, now_ns: u64) {
        if let Some(started) = self.pause_started.take() {
            self.paused_ns = self
                .paused_ns
                .saturating_add(now_ns.saturating_sub(started));
        }
    }
}
