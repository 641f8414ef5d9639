//! Real-time playback scheduler.
//!
//! A dedicated thread maps elapsed wall-clock time to a target frame index
//! every iteration, pushes that frame's level to the sink, and keeps a skip
//! counter for iterations where real time outran the loop. Commands arrive
//! over a channel from the interaction thread; position, state, and the skip
//! counter are read back through a single shared struct of atomics.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use covox_core::{AudioBuffer, Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info};

use crate::clock::{PlaybackClock, TimeSource};
use crate::level;
use crate::port::LevelSink;

/// Bounded idle wait while paused. A command arriving on the channel wakes
/// the loop immediately; the timeout only bounds how long a disconnected
/// controller can leave the thread asleep.
const IDLE_WAIT: Duration = Duration::from_millis(10);

/// Transport state of the scheduler. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransportState {
    /// Thread spawned, first iteration not yet run.
    #[default]
    Idle = 0,
    Running = 1,
    Paused = 2,
    Ended = 3,
}

impl TransportState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::Ended,
            _ => Self::Idle,
        }
    }
}

/// Commands the interaction thread can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
}

/// Scalars shared between the scheduler thread and the interaction thread.
///
/// Each field is independently consistent; the loop tolerates one iteration
/// of staleness, so no multi-field transactions are needed.
#[derive(Debug)]
pub struct SchedulerShared {
    state: AtomicU8,
    /// Last frame index the loop emitted.
    previous_target: AtomicU64,
    /// Cumulative count of frames whose individual emission was skipped
    /// because the target index advanced by more than one step between
    /// iterations. A pace diagnostic, not data loss: output is re-derived
    /// from elapsed time every iteration, so skipped frames were never
    /// audible positions, only unseen ones. Never reset.
    skipped: AtomicU64,
    sample_rate: u32,
    frame_count: u64,
}

impl SchedulerShared {
    fn new(sample_rate: u32, frame_count: u64) -> Self {
        Self {
            state: AtomicU8::new(TransportState::Idle as u8),
            previous_target: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            sample_rate,
            frame_count,
        }
    }

    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TransportState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Last emitted frame index.
    pub fn position_frame(&self) -> u64 {
        self.previous_target.load(Ordering::Relaxed)
    }

    /// Cumulative skipped-frame count since playback start.
    pub fn skipped_total(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Handle to a running scheduler thread.
///
/// Owns the command channel and the join handle; consumed by
/// [`crate::transport::TransportController`] for the interactive surface.
pub struct PlaybackScheduler {
    shared: Arc<SchedulerShared>,
    command_tx: Sender<Command>,
    handle: std::thread::JoinHandle<Result<()>>,
}

impl PlaybackScheduler {
    /// Spawn the playback thread.
    ///
    /// The scheduler takes exclusive ownership of the decoded buffer and the
    /// sink; both are released when the thread finishes. On every exit path
    /// the thread writes one silence byte last, so joining the scheduler
    /// leaves the device at its zero level.
    pub fn spawn<S, T>(buffer: AudioBuffer, sink: S, time: T) -> Result<Self>
    where
        S: LevelSink + 'static,
        T: TimeSource + 'static,
    {
        let shared = Arc::new(SchedulerShared::new(
            buffer.sample_rate(),
            buffer.frame_count(),
        ));
        // Commands are human-triggered; a small bound is ample.
        let (command_tx, command_rx) = bounded(16);

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("covox-playback".to_string())
            .spawn(move || {
                let worker = SchedulerWorker::new(buffer, sink, time, worker_shared, command_rx);
                worker.run()
            })
            .map_err(|e| Error::Playback(format!("failed to spawn playback thread: {e}")))?;

        Ok(Self {
            shared,
            command_tx,
            handle,
        })
    }

    pub fn shared(&self) -> Arc<SchedulerShared> {
        Arc::clone(&self.shared)
    }

    /// Send a command. Silently dropped if the thread has already ended.
    pub fn send(&self, command: Command) {
        let _ = self.command_tx.try_send(command);
    }

    /// Wait for the scheduler thread to finish and surface its result.
    ///
    /// Must complete before the process releases the sink's device; the
    /// thread's final act is the silence write.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| Error::Playback("playback thread panicked".to_string()))?
    }
}

/// The playback loop, owned entirely by the scheduler thread.
struct SchedulerWorker<S, T> {
    buffer: AudioBuffer,
    sink: S,
    time: T,
    shared: Arc<SchedulerShared>,
    command_rx: Receiver<Command>,
}

impl<S: LevelSink, T: TimeSource> SchedulerWorker<S, T> {
    const fn new(
        buffer: AudioBuffer,
        sink: S,
        time: T,
        shared: Arc<SchedulerShared>,
        command_rx: Receiver<Command>,
    ) -> Self {
        Self {
            buffer,
            sink,
            time,
            shared,
            command_rx,
        }
    }

    fn run(mut self) -> Result<()> {
        info!(
            "Playback started: {} Hz, {} channels, {} frames",
            self.buffer.sample_rate(),
            self.buffer.channels(),
            self.buffer.frame_count()
        );

        let outcome = self.play();

        self.shared.set_state(TransportState::Ended);
        // Leave the device at its zero level on every exit path, including
        // a failed mid-playback write.
        let silenced = self.sink.write_silence();

        match &outcome {
            Ok(()) => info!(
                "Playback ended at frame {} ({} frames skipped)",
                self.shared.position_frame(),
                self.shared.skipped_total()
            ),
            Err(e) => debug!("Playback loop exited with error: {e}"),
        }

        outcome.and(silenced)
    }

    fn play(&mut self) -> Result<()> {
        let mut clock = PlaybackClock::new(self.buffer.sample_rate(), self.time.now_ns());
        let mut previous: u64 = 0;

        self.shared.set_state(TransportState::Running);

        loop {
            // Observe pending commands once per iteration.
            loop {
                match self.command_rx.try_recv() {
                    Ok(command) => {
                        if !self.handle_command(command, &mut clock) {
                            return Ok(());
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    // Controller dropped: cooperative stop.
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }

            // While paused, no cadence-sensitive work: idle-wait on the
            // channel so a resume or stop wakes the loop promptly.
            if self.shared.state() == TransportState::Paused {
                match self.command_rx.recv_timeout(IDLE_WAIT) {
                    Ok(command) => {
                        if !self.handle_command(command, &mut clock) {
                            return Ok(());
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                }
                continue;
            }

            let target = clock.target_frame(self.time.now_ns());

            // Real time has run past the last frame: natural end.
            let Some(frame) = self.buffer.frame(target) else {
                return Ok(());
            };

            // Index jumped more than one step: the loop could not visit the
            // intermediate positions individually.
            if target > previous + 1 {
                self.shared
                    .skipped
                    .fetch_add(target - previous - 1, Ordering::Relaxed);
            }

            let sample = level::first_channel(frame);
            self.sink.write_level(level::map_sample(sample))?;

            previous = target;
            self.shared
                .previous_target
                .store(target, Ordering::Relaxed);
        }
    }

    /// Apply a command; returns false when the loop should exit.
    fn handle_command(&mut self, command: Command, clock: &mut PlaybackClock) -> bool {
        match command {
            Command::TogglePause => {
                match self.shared.state() {
                    TransportState::Running => {
                        clock.pause(self.time.now_ns());
                        self.shared.set_state(TransportState::Paused);
                        debug!("Paused");
                    }
                    TransportState::Paused => {
                        clock.resume(self.time.now_ns());
                        self.shared.set_state(TransportState::Running);
                        debug!("Resumed");
                    }
                    TransportState::Idle | TransportState::Ended => {}
                }
                true
            }
            Command::Stop => {
                self.shared.set_state(TransportState::Ended);
                debug!("Stop requested");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;

    /// Sink recording every byte written, shared with the test thread.
    #[derive(Clone, Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl LevelSink for RecordingSink {
        fn write_level(&mut self, byte: u8) -> Result<()> {
            self.written.lock().unwrap().push(byte);
            Ok(())
        }
    }

    /// Time source advancing by a fixed step per loop iteration.
    ///
    /// The scheduler takes one reading at playback start and one per
    /// iteration; the start reading and the first iteration both see zero,
    /// so iteration `i` targets frame `i - 1`.
    struct StepClock {
        calls: AtomicU64,
        step_ns: u64,
    }

    impl StepClock {
        const fn new(step_ns: u64) -> Self {
            Self {
                calls: AtomicU64::new(0),
                step_ns,
            }
        }
    }

    impl TimeSource for StepClock {
        fn now_ns(&self) -> u64 {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            n.saturating_sub(1) * self.step_ns
        }
    }

    /// Time source advancing one frame per iteration at 1000 Hz, except
    /// every fifth iteration jumps 50 ms, simulating a stalled loop.
    struct StallClock {
        calls: AtomicU64,
    }

    impl StallClock {
        /// Reading for iteration index `m` (zero-based).
        const fn time_ms(m: u64) -> u64 {
            let stalls = m / 5;
            (m - stalls) + stalls * 50
        }
    }

    impl TimeSource for StallClock {
        fn now_ns(&self) -> u64 {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            Self::time_ms(n.saturating_sub(1)) * 1_000_000
        }
    }

    fn mono_zeros(frames: usize, rate: u32) -> AudioBuffer {
        AudioBuffer::new(vec![0i16; frames], rate, 1)
    }

    #[test]
    fn test_perfect_clock_emits_every_frame() {
        // 1 s of zeros at 8 kHz with a clock advancing exactly one sample
        // period per loop iteration: 8000 writes of the 128 midpoint, no
        // skips, then one trailing silence byte.
        let sink = RecordingSink::default();
        let written = Arc::clone(&sink.written);

        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(8000, 8000), sink, StepClock::new(125_000))
                .unwrap();
        let shared = scheduler.shared();
        scheduler.join().unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 8001);
        assert!(written[..8000].iter().all(|&b| b == 128));
        assert_eq!(written[8000], 0);
        assert_eq!(shared.skipped_total(), 0);
        assert_eq!(shared.state(), TransportState::Ended);
    }

    #[test]
    fn test_immediate_stop_silences_once() {
        let sink = RecordingSink::default();
        let written = Arc::clone(&sink.written);

        // Frozen clock: playback would run forever without the stop.
        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(8000, 8000), sink, StepClock::new(0)).unwrap();
        let shared = scheduler.shared();
        scheduler.send(Command::Stop);
        scheduler.join().unwrap();

        assert_eq!(shared.state(), TransportState::Ended);

        // All level writes are the 128 midpoint; the single zero byte is the
        // silence write, and it is the thread's final act before join.
        let written = written.lock().unwrap();
        let zeros = written.iter().filter(|&&b| b == 0).count();
        assert_eq!(zeros, 1);
        assert_eq!(written.last(), Some(&0));
    }

    #[test]
    fn test_stalled_loop_accumulates_skips() {
        // A 50 ms stall at 1000 Hz lands the target index 50 frames ahead of
        // the previous iteration, so each stall books 49 skipped frames.
        let frames: u64 = 1000;
        let sink = RecordingSink::default();
        let written = Arc::clone(&sink.written);

        let clock = StallClock {
            calls: AtomicU64::new(0),
        };

        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(frames as usize, 1000), sink, clock).unwrap();
        let shared = scheduler.shared();
        scheduler.join().unwrap();

        // Model the loop against the same reading sequence: at 1000 Hz the
        // target frame equals the reading in milliseconds.
        let mut expected_skipped = 0;
        let mut expected_writes = 0u64;
        let mut previous = 0u64;
        let mut m = 0u64;
        loop {
            let target = StallClock::time_ms(m);
            if target >= frames {
                break;
            }
            if target > previous + 1 {
                expected_skipped += target - previous - 1;
            }
            expected_writes += 1;
            previous = target;
            m += 1;
        }

        assert_eq!(shared.skipped_total(), expected_skipped);
        assert!(expected_skipped >= 49);
        assert_eq!(expected_skipped % 49, 0);

        let written = written.lock().unwrap();
        assert_eq!(written.len() as u64, expected_writes + 1); // + silence
    }

    #[test]
    fn test_empty_buffer_ends_immediately() {
        let sink = RecordingSink::default();
        let written = Arc::clone(&sink.written);

        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(0, 8000), sink, StepClock::new(0)).unwrap();
        scheduler.join().unwrap();

        assert_eq!(*written.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_pause_freezes_position_across_idle_waits() {
        let sink = RecordingSink::default();

        // Real clock: the position must not move while paused regardless of
        // how long the pause lasts.
        let scheduler = PlaybackScheduler::spawn(
            mono_zeros(44_100 * 10, 44_100),
            sink,
            crate::clock::MonotonicClock::new(),
        )
        .unwrap();
        let shared = scheduler.shared();

        std::thread::sleep(Duration::from_millis(30));
        scheduler.send(Command::TogglePause);

        // Wait until the pause is observed, then sample the position.
        while shared.state() != TransportState::Paused {
            std::thread::sleep(Duration::from_millis(1));
        }
        let at_pause = shared.position_frame();

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(shared.position_frame(), at_pause);

        scheduler.send(Command::TogglePause);
        scheduler.send(Command::Stop);
        scheduler.join().unwrap();
    }

    #[test]
    fn test_dropped_controller_stops_playback() {
        struct NullSink;
        impl LevelSink for NullSink {
            fn write_level(&mut self, _byte: u8) -> Result<()> {
                Ok(())
            }
        }

        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(8000, 8000), NullSink, StepClock::new(0)).unwrap();
        let handle = scheduler.handle;
        drop(scheduler.command_tx);

        // Channel disconnect is observed as a cooperative stop.
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_write_failure_is_fatal_but_still_silences() {
        struct FailingSink {
            writes: Arc<Mutex<Vec<u8>>>,
            fail_after: usize,
        }

        impl LevelSink for FailingSink {
            fn write_level(&mut self, byte: u8) -> Result<()> {
                let mut writes = self.writes.lock().unwrap();
                if writes.len() >= self.fail_after && byte != 0 {
                    return Err(Error::PortWrite("EIO".to_string()));
                }
                writes.push(byte);
                Ok(())
            }
        }

        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = FailingSink {
            writes: Arc::clone(&writes),
            fail_after: 3,
        };

        let scheduler =
            PlaybackScheduler::spawn(mono_zeros(8000, 8000), sink, StepClock::new(125_000))
                .unwrap();
        let shared = scheduler.shared();
        let result = scheduler.join();

        assert!(matches!(result, Err(Error::PortWrite(_))));
        assert_eq!(shared.state(), TransportState::Ended);
        // The silence write still went out after the failure.
        assert_eq!(writes.lock().unwrap().last(), Some(&0));
    }
}
