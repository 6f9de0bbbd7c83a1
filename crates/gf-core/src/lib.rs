//! gf-core: shared errors, configuration, requests, and events.
//!
//! This crate is the foundational dependency for the other gf-* crates. It
//! owns the unified [`Error`] type, the TOML-backed [`config::Config`], the
//! immutable [`ConversionRequest`], and the worker-to-invoker event channel.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod request;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use events::{CompletionStatus, ConversionEvent, EventSink, EventStream};
pub use ids::RunId;
pub use request::{ConversionRequest, Scale};
