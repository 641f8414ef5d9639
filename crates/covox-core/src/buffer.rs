//! Decoded audio storage.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

/// Fully decoded audio: interleaved signed 16-bit samples plus format
/// metadata.
///
/// Produced once by the decoder and read-only afterwards. The scheduler owns
/// the buffer for the lifetime of playback and releases it when playback
/// ends. Invariant: `samples.len() == frame_count() * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples.
    ///
    /// A ragged tail (a partial final frame) is dropped so the invariant
    /// holds by construction. `channels` of zero is treated as mono.
    pub fn new(mut samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);

        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels per frame.
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Total number of frames.
    pub fn frame_count(&self) -> u64 {
        (self.samples.len() / self.channels as usize) as u64
    }

    /// Total number of samples across all channels.
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / f64::from(self.sample_rate)
    }

    /// The interleaved samples of frame `index`, or `None` past the end.
    pub fn frame(&self, index: u64) -> Option<&[i16]> {
        if index >= self.frame_count() {
            return None;
        }
        let width = self.channels as usize;
        let start = index as usize * width;
        Some(&self.samples[start..start + width])
    }
}
