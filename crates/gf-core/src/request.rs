//! Conversion requests and their validation.
//!
//! A [`ConversionRequest`] is built once per invocation and never mutated.
//! [`ConversionRequest::validate`] must pass before the pipeline spawns any
//! process.

use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConversionConfig;
use crate::error::{Error, Result};

/// Input container extensions accepted by the pipeline (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "webm", "avi", "mkv"];

/// Extension given to the final output file.
pub const OUTPUT_EXTENSION: &str = "gif";

/// Whether `path` carries one of [`SUPPORTED_EXTENSIONS`] (case-insensitive).
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Target output scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScaleRepr", into = "ScaleRepr")]
pub enum Scale {
    /// Scale to this width, keeping the aspect ratio.
    Width(NonZeroU32),
    /// Keep the source size, rounded down to even dimensions.
    Preserve,
}

impl Scale {
    /// Build a [`Scale::Width`], or `None` for a zero width.
    pub fn width(width: u32) -> Option<Self> {
        NonZeroU32::new(width).map(Scale::Width)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Width(NonZeroU32::new(800).unwrap_or(NonZeroU32::MIN))
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Width(w) => write!(f, "{w}"),
            Scale::Preserve => f.write_str("auto"),
        }
    }
}

impl FromStr for Scale {
    type Err = Error;

    /// Accepts a positive width, or `auto` / `-1` for [`Scale::Preserve`].
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s == "-1" {
            return Ok(Scale::Preserve);
        }
        s.parse::<u32>()
            .ok()
            .and_then(Scale::width)
            .ok_or_else(|| Error::validation(format!("invalid scale '{s}'; expected a positive width or 'auto'")))
    }
}

/// Serde representation: an integer width or the string `"auto"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ScaleRepr {
    Width(i64),
    Named(String),
}

impl TryFrom<ScaleRepr> for Scale {
    type Error = Error;

    fn try_from(repr: ScaleRepr) -> Result<Self> {
        match repr {
            ScaleRepr::Width(-1) => Ok(Scale::Preserve),
            ScaleRepr::Width(w) => u32::try_from(w)
                .ok()
                .and_then(Scale::width)
                .ok_or_else(|| Error::validation(format!("invalid scale width {w}"))),
            ScaleRepr::Named(s) => s.parse(),
        }
    }
}

impl From<Scale> for ScaleRepr {
    fn from(scale: Scale) -> Self {
        match scale {
            Scale::Width(w) => ScaleRepr::Width(i64::from(w.get())),
            Scale::Preserve => ScaleRepr::Named("auto".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ConversionRequest
// ---------------------------------------------------------------------------

/// A single video-to-GIF conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    source: PathBuf,
    scale: Scale,
    fps: u32,
    palette: bool,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, scale: Scale, fps: u32, palette: bool) -> Self {
        Self {
            source: source.into(),
            scale,
            fps,
            palette,
        }
    }

    /// Build a request for `source` using the configured defaults.
    pub fn with_defaults(source: impl Into<PathBuf>, config: &ConversionConfig) -> Self {
        Self::new(source, config.scale, config.fps, config.palette)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Target frame rate. Only used by the single-pass encode.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn palette(&self) -> bool {
        self.palette
    }

    /// The source path with its extension replaced by [`OUTPUT_EXTENSION`].
    pub fn output_path(&self) -> PathBuf {
        self.source.with_extension(OUTPUT_EXTENSION)
    }

    /// Check the request against the filesystem and `config`.
    ///
    /// Performs no process I/O. Checks, in order: non-empty path, supported
    /// extension, optional unsafe-name rule, source existence, frame rate,
    /// and the overwrite guard.
    pub fn validate(&self, config: &ConversionConfig) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(Error::validation("no file selected"));
        }

        if !is_supported_extension(&self.source) {
            let ext = self
                .source
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(none)".into());
            return Err(Error::validation(format!(
                "unsupported file extension {ext}; expected one of {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }

        if config.reject_unsafe_names {
            let name = self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.contains(' ') || name.contains('#') {
                return Err(Error::validation(format!(
                    "invalid file name '{name}': spaces and '#' are not allowed"
                )));
            }
        }

        if !self.source.is_file() {
            return Err(Error::validation(format!(
                "source file does not exist: {}",
                self.source.display()
            )));
        }

        if !self.palette && self.fps == 0 {
            return Err(Error::validation("frame rate must be positive"));
        }

        let output = self.output_path();
        if !config.overwrite_output && output.exists() {
            return Err(Error::validation(format!(
                "output already exists: {}",
                output.display()
            )));
        }

        Ok(())
    }
}
