//! # gf-pipeline
//!
//! Conversion orchestration for gifforge.
//!
//! - **[`ProgressParser`]** / **[`ProgressState`]** -- frame numbers from
//!   encoder status lines, folded into a clamped fraction.
//! - **[`PipelineState`]** -- the run state machine.
//! - **[`ConversionPipeline`]** -- validate, probe, encode, clean up.
//! - **[`ConversionWorker`]** -- runs a pipeline on a background task and
//!   reports through an event stream.

pub mod pipeline;
pub mod progress;
pub mod state;
pub mod worker;

pub use pipeline::{ConversionPipeline, PipelineSettings};
pub use progress::{ProgressParser, ProgressState};
pub use state::PipelineState;
pub use worker::ConversionWorker;
