//! Outward-facing transport surface for the interaction thread.

use covox_core::Result;
use std::sync::Arc;

use crate::scheduler::{Command, PlaybackScheduler, SchedulerShared, TransportState};

/// Format seconds as `HH:MM:SS.s`.
///
/// Returns an owned string; the original player formatted into a shared
/// static buffer, which aliased between calls.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let hours = (seconds / 3600.0) as u64;
    let minutes = ((seconds % 3600.0) / 60.0) as u64;
    let secs = seconds % 60.0;
    format!("{hours:02}:{minutes:02}:{secs:04.1}")
}

/// Control surface consumed by the interactive thread.
///
/// Wraps the scheduler handle: issues pause/resume/stop and reads back the
/// current position and skip count. All operations are safe to call from a
/// thread other than the scheduler's own.
pub struct TransportController {
    scheduler: PlaybackScheduler,
    shared: Arc<SchedulerShared>,
    /// Cumulative skip count already reported through [`Self::take_skipped`].
    skipped_seen: u64,
}

impl TransportController {
    pub fn new(scheduler: PlaybackScheduler) -> Self {
        let shared = scheduler.shared();
        Self {
            scheduler,
            shared,
            skipped_seen: 0,
        }
    }

    pub fn toggle_pause(&self) {
        self.scheduler.send(Command::TogglePause);
    }

    pub fn stop(&self) {
        self.scheduler.send(Command::Stop);
    }

    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    pub fn is_ended(&self) -> bool {
        self.state() == TransportState::Ended
    }

    /// Seconds played so far, derived from the last emitted frame.
    #[allow(clippy::cast_precision_loss)]
    pub fn position_seconds(&self) -> f64 {
        let rate = self.shared.sample_rate();
        if rate == 0 {
            return 0.0;
        }
        self.shared.position_frame() as f64 / f64::from(rate)
    }

    /// Current position as `HH:MM:SS.s`.
    pub fn position_string(&self) -> String {
        format_duration(self.position_seconds())
    }

    /// Frames skipped since the last poll.
    ///
    /// Resets only this controller's view; the scheduler's cumulative
    /// counter is never reset.
    pub fn take_skipped(&mut self) -> u64 {
        let total = self.shared.skipped_total();
        let delta = total - self.skipped_seen;
        self.skipped_seen = total;
        delta
    }

    /// Join the scheduler thread and surface its terminal result.
    ///
    /// The thread's final act is the silence write, so once this returns the
    /// device is at its zero level and the sink can be released.
    pub fn join(self) -> Result<()> {
        self.scheduler.join()
    }
}
