//! Pipeline run states.

use std::fmt;

use serde::Serialize;

/// Where a pipeline run currently is.
///
/// ```text
/// Idle -> Probing -> [StagingPalette ->] Encoding -> Succeeded
///            \              \               \-----> Failed
///             \--------------\---------------------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Probing,
    StagingPalette,
    Encoding,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }

    /// A run is in flight.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            PipelineState::Probing | PipelineState::StagingPalette | PipelineState::Encoding
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle | Succeeded | Failed, Probing) => true,
            (Probing, StagingPalette | Encoding | Failed) => true,
            (StagingPalette, Encoding | Failed) => true,
            (Encoding, Succeeded | Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Probing => "probing",
            PipelineState::StagingPalette => "staging palette",
            PipelineState::Encoding => "encoding",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineState::*;

    #[test]
    fn legal_paths() {
        assert!(Idle.can_advance_to(Probing));
        assert!(Probing.can_advance_to(StagingPalette));
        assert!(StagingPalette.can_advance_to(Encoding));
        assert!(Probing.can_advance_to(Encoding));
        assert!(Encoding.can_advance_to(Succeeded));
        assert!(Succeeded.can_advance_to(Probing));
        assert!(Failed.can_advance_to(Probing));
    }

    #[test]
    fn every_active_state_can_fail() {
        for s in [Probing, StagingPalette, Encoding] {
            assert!(s.can_advance_to(Failed), "{s} -> failed");
            assert!(s.is_busy());
        }
    }

    #[test]
    fn illegal_paths() {
        assert!(!Idle.can_advance_to(Encoding));
        assert!(!Encoding.can_advance_to(StagingPalette));
        assert!(!StagingPalette.can_advance_to(Succeeded));
        assert!(!Succeeded.can_advance_to(Failed));
        assert!(!Probing.can_advance_to(Probing));
    }

    #[test]
    fn terminal_states() {
        assert!(Succeeded.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Idle.is_terminal());
        assert!(!Idle.is_busy());
    }
}
