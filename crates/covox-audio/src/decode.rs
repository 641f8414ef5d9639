//! Whole-file audio decoding using symphonia.
//!
//! The player needs the entire track in memory before the scheduler starts,
//! so this is a one-shot decode into an [`AudioBuffer`] rather than a
//! streaming pipeline.

use std::fs::File;
use std::path::Path;

use covox_core::{AudioBuffer, Error, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, info, warn};

/// Decode `path` fully into interleaved 16-bit samples.
///
/// Failures map onto the fixed decode-failure kinds: unrecognised container,
/// malformed stream, unsupported codec, or a system/file error. All are
/// fatal to the run; the caller never sees partially decoded data.
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| match e {
            SymphoniaError::IoError(io) => Error::Io(io),
            other => Error::UnrecognisedFormat(other.to_string()),
        })?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioTrack(path.display().to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::MalformedFile("track has no sample rate".to_string()))?;
    let channels = track.codec_params.channels.map_or(1, |c| c.count() as u16);

    debug!(
        "Audio track: id={}, sample_rate={}, channels={}",
        track_id, sample_rate, channels
    );

    let decoder_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| Error::UnsupportedEncoding(e.to_string()))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(Error::MalformedFile(format!("failed to read packet: {e}")));
            }
        };

        // Skip packets for other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                });
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame: log and keep going.
                warn!("Decode error (skipping): {e}");
            }
            Err(e) => {
                return Err(Error::MalformedFile(format!("decode failed: {e}")));
            }
        }
    }

    let buffer = AudioBuffer::new(samples, sample_rate, channels);

    info!(
        "Decoded {}: {} Hz, {} channels, {} frames ({:.1} s)",
        path.display(),
        buffer.sample_rate(),
        buffer.channels(),
        buffer.frame_count(),
        buffer.duration_seconds()
    );

    Ok(buffer)
}
