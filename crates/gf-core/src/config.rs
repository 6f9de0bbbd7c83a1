//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! tool, conversion, and limit sections. Every section defaults sensibly so a
//! completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::request::Scale;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
    pub limits: LimitsConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Read and parse a config file. A missing or malformed file is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.conversion.fps == 0 {
            warnings.push("conversion.fps is 0; single-pass conversions will be rejected".into());
        }

        if let Some(ref dir) = self.conversion.scratch_dir {
            if !dir.is_dir() {
                warnings.push(format!(
                    "conversion.scratch_dir {} is not a directory",
                    dir.display()
                ));
            }
        }

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        if self.limits.probe_timeout_secs == 0 {
            warnings.push("limits.probe_timeout_secs is 0; every probe will time out".into());
        }

        if self.limits.encode_timeout_secs == Some(0) {
            warnings.push("limits.encode_timeout_secs is 0; every encode will time out".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools. Unset entries are looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Conversion defaults and policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Default output scale (`800`, or `"auto"` to keep the source size).
    pub scale: Scale,
    /// Default frame rate for single-pass conversions.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Use the two-pass palette encode by default.
    pub palette: bool,
    /// Let the final encode replace an existing output file.
    #[serde(default = "default_true")]
    pub overwrite_output: bool,
    /// Reject source names containing spaces or `#`.
    pub reject_unsafe_names: bool,
    /// Directory for the temporary palette image. Defaults to the system
    /// temp directory.
    pub scratch_dir: Option<PathBuf>,
}

fn default_fps() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: Scale::default(),
            fps: default_fps(),
            palette: false,
            overwrite_output: default_true(),
            reject_unsafe_names: false,
            scratch_dir: None,
        }
    }
}

impl ConversionConfig {
    /// The scratch directory to use for this process.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Process time limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum time the frame-count probe may take.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Maximum time a single encode stage may take; unbounded when unset.
    pub encode_timeout_secs: Option<u64>,
}

fn default_probe_timeout() -> u64 {
    300
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            encode_timeout_secs: None,
        }
    }
}

impl LimitsConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn encode_timeout(&self) -> Option<Duration> {
        self.encode_timeout_secs.map(Duration::from_secs)
    }
}
