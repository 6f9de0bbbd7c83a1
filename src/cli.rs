use clap::{Parser, Subcommand};
use gf_core::Scale;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gifforge")]
#[command(author, version, about = "Convert video clips to animated GIFs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video file to an animated GIF next to the source
    Convert {
        /// Video file to convert (.mp4, .webm, .avi, .mkv)
        #[arg(required = true)]
        file: PathBuf,

        /// Output width in pixels, or "auto" to keep the source size
        #[arg(short, long, allow_hyphen_values = true)]
        scale: Option<Scale>,

        /// Frame rate for single-pass conversion
        #[arg(short, long)]
        fps: Option<u32>,

        /// Use the two-pass palette encode for better colors
        #[arg(short, long, overrides_with = "no_palette")]
        palette: bool,

        /// Use the single-pass encode even if the config enables the palette
        #[arg(long, overrides_with = "palette")]
        no_palette: bool,
    },

    /// Count the frames of a video file
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Resolve a `--palette` / `--no-palette` pair; `None` defers to config.
pub fn palette_choice(palette: bool, no_palette: bool) -> Option<bool> {
    match (palette, no_palette) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
