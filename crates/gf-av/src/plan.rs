//! Encoder command construction.
//!
//! [`CommandBuilder::build`] turns a [`ConversionRequest`] into an
//! [`EncodePlan`]: one ffmpeg stage for a direct GIF encode, or two for the
//! palette-optimized path (`palettegen`, then `paletteuse`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use gf_core::{ConversionRequest, Scale};

use crate::runner::Invocation;

/// Suffix appended to the source stem to name the temporary palette.
const PALETTE_SUFFIX: &str = "_palette.png";

/// What an encode stage does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Generate a 256-color palette image from the source.
    PaletteGen,
    /// Encode the GIF against a previously generated palette.
    PaletteUse,
    /// Encode the GIF directly at a fixed frame rate.
    Direct,
}

impl StageKind {
    /// Short label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            StageKind::PaletteGen => "palette generation",
            StageKind::PaletteUse | StageKind::Direct => "encoding",
        }
    }
}

/// A single encoder invocation and the file it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeStage {
    /// One-based position within the plan.
    pub number: u8,
    pub kind: StageKind,
    pub invocation: Invocation,
    /// File written by this stage.
    pub output: PathBuf,
}

/// Ordered encoder stages for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    stages: Vec<EncodeStage>,
    output: PathBuf,
    palette: Option<PathBuf>,
}

impl EncodePlan {
    pub fn stages(&self) -> &[EncodeStage] {
        &self.stages
    }

    /// Final GIF path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Temporary palette path, present only in palette mode.
    pub fn temp_artifact(&self) -> Option<&Path> {
        self.palette.as_deref()
    }
}

/// Builds encoder invocations for a fixed ffmpeg binary and scratch directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    ffmpeg: PathBuf,
    scratch_dir: PathBuf,
    overwrite: bool,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    pub fn new(ffmpeg: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            scratch_dir: scratch_dir.into(),
            overwrite: true,
            timeout: None,
        }
    }

    /// Whether the final stage may replace an existing output (`-y`) or must
    /// refuse (`-n`).
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Per-stage time limit.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the temporary palette image for `source`.
    pub fn palette_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".into());
        self.scratch_dir.join(format!("{stem}{PALETTE_SUFFIX}"))
    }

    pub fn build(&self, request: &ConversionRequest) -> EncodePlan {
        let source = path_arg(request.source());
        let output = request.output_path();
        let scale = scale_filter(request.scale());
        let overwrite_flag = if self.overwrite { "-y" } else { "-n" };

        if request.palette() {
            let palette = self.palette_path(request.source());

            let generate = self.stage(
                1,
                StageKind::PaletteGen,
                vec![
                    "-i".into(),
                    source.clone(),
                    "-vf".into(),
                    format!("{scale},palettegen"),
                    "-y".into(),
                    path_arg(&palette),
                ],
                palette.clone(),
            );

            let encode = self.stage(
                2,
                StageKind::PaletteUse,
                vec![
                    "-i".into(),
                    source,
                    "-i".into(),
                    path_arg(&palette),
                    "-lavfi".into(),
                    format!("{scale} [x]; [x][1:v] paletteuse"),
                    overwrite_flag.into(),
                    path_arg(&output),
                ],
                output.clone(),
            );

            EncodePlan {
                stages: vec![generate, encode],
                output,
                palette: Some(palette),
            }
        } else {
            let encode = self.stage(
                1,
                StageKind::Direct,
                vec![
                    "-i".into(),
                    source,
                    "-vf".into(),
                    format!("fps={},{scale}", request.fps()),
                    "-c:v".into(),
                    "gif".into(),
                    overwrite_flag.into(),
                    path_arg(&output),
                ],
                output.clone(),
            );

            EncodePlan {
                stages: vec![encode],
                output,
                palette: None,
            }
        }
    }

    fn stage(&self, number: u8, kind: StageKind, args: Vec<String>, output: PathBuf) -> EncodeStage {
        EncodeStage {
            number,
            kind,
            invocation: Invocation::new(self.ffmpeg.clone(), args).with_timeout(self.timeout),
            output,
        }
    }
}

/// The scale filter expression for `scale`.
pub fn scale_filter(scale: Scale) -> String {
    match scale {
        Scale::Width(w) => format!("scale={w}:-1:flags=lanczos"),
        Scale::Preserve => "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
