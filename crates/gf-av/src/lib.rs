//! # gf-av
//!
//! External tool plumbing for the gifforge conversion pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   and cancellation support, capturing or streaming process output.
//! - **The spawner seam** ([`ToolRunner`], [`ProcessRunner`]) -- everything
//!   above this crate runs processes through the trait.
//! - **Frame-count probing** ([`MediaProbe`]).
//! - **Encoder command construction** ([`CommandBuilder`], [`EncodePlan`]).
//! - **Temp file cleanup** ([`TempArtifact`]).

pub mod command;
pub mod janitor;
pub mod plan;
pub mod probe;
pub mod runner;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{StreamExit, ToolCommand, ToolOutput};
pub use janitor::{CleanupOutcome, CleanupWarning, TempArtifact};
pub use plan::{CommandBuilder, EncodePlan, EncodeStage, StageKind};
pub use probe::MediaProbe;
pub use runner::{Invocation, ProcessRunner, ToolRunner};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
