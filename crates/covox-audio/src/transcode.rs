//! External ffmpeg conversion for inputs the decoder is not configured for.
//!
//! Mirrors the original player: anything outside the native set is converted
//! to a temporary WAV first, then decoded like any other file.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use covox_core::{Error, Result};
use tracing::info;

/// Container extensions the bundled symphonia feature set decodes directly.
const NATIVE_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "oga", "m4a", "mp4", "aac"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Whether `path` can be handed to the decoder as-is.
pub fn is_native(path: &Path) -> bool {
    NATIVE_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Return a path the decoder can open: the input itself when native,
/// otherwise a freshly transcoded temporary WAV.
pub fn ensure_native(path: &Path) -> Result<PathBuf> {
    if is_native(path) {
        return Ok(path.to_path_buf());
    }
    transcode_to_wav(path)
}

/// Convert `input` to WAV in the temp directory, overwriting any previous
/// conversion, and return the output path.
fn transcode_to_wav(input: &Path) -> Result<PathBuf> {
    let output = std::env::temp_dir().join("covox-wav-convert.wav");

    info!(
        "{} is not natively decodable, converting to WAV via ffmpeg",
        input.display()
    );

    let status = Command::new("ffmpeg")
        .arg("-y")
        .args(["-v", "quiet"])
        .arg("-i")
        .arg(input)
        .arg(&output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| Error::Transcode(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(Error::Transcode(format!(
            "ffmpeg exited with {status} converting {}",
            input.display()
        )));
    }

    info!("Conversion to WAV completed: {}", output.display());
    Ok(output)
}
