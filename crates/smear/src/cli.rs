use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "smear", about = "Temporal motion blur for video files")]
pub struct Cli {
    /// Path to the input video file.
    pub input: PathBuf,

    /// Path to write the blurred output video.
    pub output: PathBuf,
}
