//! Parallel-port register sink.
//!
//! The Covox DAC is a resistor ladder hanging off the parallel port's data
//! lines: whatever byte sits in the data register is the output voltage.
//! Writing the register through `/dev/port` needs no iopl/ioperm dance, only
//! read-write access to the device node (typically root).

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use covox_core::{Error, Result};
use tracing::{debug, info};

/// The level the DAC is left at when the sink goes quiet.
pub const SILENCE_LEVEL: u8 = 0;

/// Single-byte output register abstraction.
///
/// Write failures are fatal: a one-byte register write has no meaningful
/// partial-failure recovery.
pub trait LevelSink: Send {
    /// Emit `level` to the output register.
    fn write_level(&mut self, level: u8) -> Result<()>;

    /// Emit the sink's zero level.
    fn write_silence(&mut self) -> Result<()> {
        self.write_level(SILENCE_LEVEL)
    }
}

/// Parse a parallel-port base address from its CLI form.
///
/// Accepts `0x378`-style hex or plain decimal. Zero and unparseable input
/// are rejected, matching the original player's `strtol` check.
pub fn parse_port_address(input: &str) -> Result<u16> {
    let trimmed = input.trim();
    let parsed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .map_or_else(
            || trimmed.parse::<u16>(),
            |hex| u16::from_str_radix(hex, 16),
        );

    match parsed {
        Ok(0) | Err(_) => Err(Error::InvalidPortAddress(input.to_string())),
        Ok(address) => Ok(address),
    }
}

/// Production sink driving the register through `/dev/port`.
///
/// Opening the device node is the privilege acquisition; it happens once,
/// before any playback thread starts, and failure is fatal setup.
pub struct ParallelPort {
    device: std::fs::File,
    base: u16,
}

impl ParallelPort {
    /// Open the port device at the given base address.
    pub fn open(base: u16) -> Result<Self> {
        Self::open_at(Path::new("/dev/port"), base)
    }

    fn open_at(device_path: &Path, base: u16) -> Result<Self> {
        let device = OpenOptions::new()
            .write(true)
            .open(device_path)
            .map_err(|e| Error::PortAccess(format!("{}: {e}", device_path.display())))?;

        info!("Opened parallel port at base address {base:#05x}");

        Ok(Self { device, base })
    }

    pub const fn base_address(&self) -> u16 {
        self.base
    }
}

impl LevelSink for ParallelPort {
    fn write_level(&mut self, level: u8) -> Result<()> {
        self.device
            .seek(SeekFrom::Start(u64::from(self.base)))
            .and_then(|_| self.device.write_all(&[level]))
            .map_err(|e| Error::PortWrite(format!("register {:#05x}: {e}", self.base)))
    }
}

impl Drop for ParallelPort {
    fn drop(&mut self) {
        debug!("Releasing parallel port at {:#05x}", self.base);
    }
}
