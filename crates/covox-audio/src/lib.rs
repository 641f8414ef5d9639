//! # covox-audio
//!
//! Playback engine for a parallel-port ("Covox") DAC.
//!
//! Pipeline:
//! - Whole-file decode into an immutable sample buffer
//! - Wall-clock driven scheduler emitting one byte per frame
//! - Single-byte register sink behind `/dev/port`
//!
//! Control flows the other way: a [`transport::TransportController`] issues
//! pause/resume/stop from the interactive thread and reads back position and
//! skip counts.

pub mod clock;
pub mod decode;
pub mod level;
pub mod port;
pub mod scheduler;
pub mod transcode;
pub mod transport;

pub use clock::{MonotonicClock, PlaybackClock, TimeSource};
pub use port::{LevelSink, ParallelPort};
pub use scheduler::{PlaybackScheduler, TransportState};
pub use transport::TransportController;
