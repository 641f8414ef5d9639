//! Interactive terminal loop.
//!
//! Runs on the main thread at a ~100 ms tick: polls the keyboard, redraws
//! the status line, and issues transport commands. Output timing is never
//! affected by this interval; the scheduler thread paces itself.

use std::io::{self, Write};
use std::time::Duration;

use covox_audio::transport::TransportController;
use covox_audio::TransportState;
use covox_core::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw-mode RAII guard: keystrokes arrive unbuffered and unechoed, and the
/// terminal is restored on every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Drive the transport until playback ends or the user stops it, then join
/// the scheduler thread.
pub fn interaction_loop(mut transport: TransportController) -> Result<()> {
    let _guard = RawModeGuard::enable()?;
    let mut stdout = io::stdout();

    write!(stdout, "Press spacebar to pause, Escape to exit\r\n\r\n")?;
    stdout.flush()?;

    while !transport.is_ended() {
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char(' ') => {
                        if transport.state() == TransportState::Running {
                            write!(stdout, "\r\nPaused. Press spacebar to resume.\r\n")?;
                        }
                        transport.toggle_pause();
                    }
                    KeyCode::Esc | KeyCode::Char('q') => {
                        debug!("Stop requested from keyboard");
                        transport.stop();
                        break;
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        transport.stop();
                        break;
                    }
                    _ => {}
                }
            }
        }

        if transport.state() == TransportState::Running {
            let skipped = transport.take_skipped();
            write!(
                stdout,
                "\rPosition: {}, framesSkipped: {:03}",
                transport.position_string(),
                skipped
            )?;
            // Skip bursts stay visible instead of being overdrawn.
            if skipped > 0 {
                write!(stdout, "\r\n")?;
            }
            stdout.flush()?;
        }
    }

    transport.stop();
    let result = transport.join();

    write!(stdout, "\r\n")?;
    stdout.flush()?;

    result
}
