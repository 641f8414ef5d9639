//! CLI definition using clap.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "covox")]
#[command(about = "Play an audio file through a parallel-port Covox DAC")]
pub struct Cli {
    /// Audio file to play; non-native formats are converted via ffmpeg
    pub file: PathBuf,

    /// Parallel port base address, e.g. 0x378
    pub port: String,
}
