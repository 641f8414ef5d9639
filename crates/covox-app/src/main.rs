//! # covox
//!
//! Plays an audio file through a Covox-style DAC on the parallel port:
//! decodes the whole file up front, then streams one byte per frame to the
//! port's data register under wall-clock pacing.

mod cli;
mod ui;

use clap::Parser;
use cli::Cli;
use covox_audio::transport::format_duration;
use covox_audio::{
    decode, port, transcode, MonotonicClock, ParallelPort, PlaybackScheduler, TransportController,
};
use covox_core::{Error, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Exit codes of the original player, kept for script compatibility, plus a
// distinct code for failures after playback has started.
const EXIT_BAD_ARGS: i32 = 1;
const EXIT_CANNOT_OPEN_FILE: i32 = 2;
const EXIT_PORT_ADDRESS: i32 = 3;
const EXIT_PLAYBACK: i32 = 4;

fn main() {
    // Logs go to stderr so the status line owns stdout.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "covox_app=info,covox_audio=info".into()),
        )
        .init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Help and version are not argument errors.
            let code = if e.use_stderr() { EXIT_BAD_ARGS } else { 0 };
            std::process::exit(code);
        }
    };

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(exit_code(&e));
    }
}

const fn exit_code(error: &Error) -> i32 {
    if error.is_setup() || matches!(error, Error::PortWrite(_)) {
        // Device errors, whether at acquisition or mid-playback.
        EXIT_PORT_ADDRESS
    } else if error.is_decode() {
        EXIT_CANNOT_OPEN_FILE
    } else {
        EXIT_PLAYBACK
    }
}

fn run(args: &Cli) -> Result<()> {
    // Acquire the device before touching the input, like the original
    // player: an unusable port should fail before a long transcode.
    let base = port::parse_port_address(&args.port)?;
    let sink = ParallelPort::open(base)?;

    info!(
        "Playing {} to port at {}",
        args.file.display(),
        args.port
    );

    let input = transcode::ensure_native(&args.file)?;
    let buffer = decode::decode_file(&input)?;

    println!("\nFile details:");
    println!("Sample Rate : {}", buffer.sample_rate());
    println!("Frames      : {}", buffer.frame_count());
    println!("Channels    : {}", buffer.channels());
    println!("Duration    : {}", format_duration(buffer.duration_seconds()));
    println!();

    let scheduler = PlaybackScheduler::spawn(buffer, sink, MonotonicClock::new())?;
    let transport = TransportController::new(scheduler);

    // Joins the scheduler before returning, so the register is back at its
    // zero level by the time the process exits.
    ui::interaction_loop(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_error_kind() {
        assert_eq!(
            exit_code(&Error::InvalidPortAddress("0xzz".into())),
            EXIT_PORT_ADDRESS
        );
        assert_eq!(
            exit_code(&Error::PortAccess("denied".into())),
            EXIT_PORT_ADDRESS
        );
        assert_eq!(
            exit_code(&Error::MalformedFile("truncated".into())),
            EXIT_CANNOT_OPEN_FILE
        );
        assert_eq!(
            exit_code(&Error::Transcode("ffmpeg exited".into())),
            EXIT_CANNOT_OPEN_FILE
        );
    }

    #[test]
    fn test_mid_playback_write_failure_is_a_device_error() {
        // A failed register write must not read as a usage error to scripts.
        assert_eq!(exit_code(&Error::PortWrite("EIO".into())), EXIT_PORT_ADDRESS);
        assert_ne!(exit_code(&Error::PortWrite("EIO".into())), EXIT_BAD_ARGS);
        assert_eq!(
            exit_code(&Error::Playback("thread panicked".into())),
            EXIT_PLAYBACK
        );
    }
}
