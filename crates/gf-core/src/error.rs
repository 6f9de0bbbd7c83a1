//! Unified error type for gifforge.
//!
//! Every crate in the workspace funnels its failures into [`Error`]. The
//! pipeline turns whichever variant ends a run into a single
//! `Completed(Failure, message)` event, so the display strings here are what
//! the user ends up reading.

/// Unified error type covering all failure modes of a conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The conversion request failed validation. Raised before any process
    /// is spawned.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The inspection tool failed or returned unusable output.
    #[error("Probe error: {message}")]
    Probe {
        /// Human-readable error description.
        message: String,
        /// Raw tool output kept for diagnostics.
        raw_output: String,
    },

    /// An encode stage exited unsuccessfully.
    #[error("Encode error [stage {stage} ({label})]: {message}")]
    Encode {
        /// One-based stage number within the plan.
        stage: u8,
        /// Short stage label ("palette generation", "encoding").
        label: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool could not be located, spawned, or awaited.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A conversion is already running on this worker.
    #[error("A conversion is already in progress")]
    Busy,

    /// The run was cancelled by the invoker.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Stable short tag for this error, used in logs and completion events.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Probe { .. } => "probe",
            Error::Encode { .. } => "encode",
            Error::Tool { .. } => "tool",
            Error::Busy => "busy",
            Error::Cancelled => "cancelled",
            Error::Config(_) => "config",
        }
    }

    /// The failing stage number, for [`Error::Encode`].
    pub fn stage(&self) -> Option<u8> {
        match self {
            Error::Encode { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Convenience constructor for [`Error::Probe`].
    pub fn probe(message: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Error::Probe {
            message: message.into(),
            raw_output: raw_output.into(),
        }
    }

    /// Convenience constructor for [`Error::Encode`].
    pub fn encode(stage: u8, label: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Encode {
            stage,
            label: label.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = Error::validation("unsupported extension: .xyz");
        assert_eq!(
            err.to_string(),
            "Validation error: unsupported extension: .xyz"
        );
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn probe_keeps_raw_output() {
        let err = Error::probe("no frame count", "N/A\n");
        assert_eq!(err.to_string(), "Probe error: no frame count");
        match err {
            Error::Probe { raw_output, .. } => assert_eq!(raw_output, "N/A\n"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn encode_display_names_stage() {
        let err = Error::encode(2, "encoding", "exited with status 1");
        assert_eq!(
            err.to_string(),
            "Encode error [stage 2 (encoding)]: exited with status 1"
        );
        assert_eq!(err.stage(), Some(2));
        assert_eq!(err.kind(), "encode");
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "not found");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: not found");
    }

    #[test]
    fn config_display() {
        let err = Error::Config("config parse error: expected `=`".into());
        assert_eq!(err.to_string(), "Config error: config parse error: expected `=`");
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn busy_and_cancelled_kinds() {
        assert_eq!(Error::Busy.kind(), "busy");
        assert_eq!(Error::Cancelled.kind(), "cancelled");
    }
}
