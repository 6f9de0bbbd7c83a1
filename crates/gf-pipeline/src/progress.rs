//! Encoder status-line parsing.
//!
//! ffmpeg prints a status line roughly twice a second:
//!
//! ```text
//! frame=   42 fps= 21 q=-0.0 size=    1024kB time=00:00:01.40 bitrate=...
//! ```
//!
//! [`ProgressParser::feed`] pulls the frame number out of such a line;
//! [`ProgressState`] folds frame numbers into a clamped fraction.

use std::sync::LazyLock;

use regex::Regex;

static FRAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"frame=\s*(\d+)").expect("frame pattern is valid"));

/// Stateless frame-number extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressParser;

impl ProgressParser {
    /// Return the first integer following `frame=` in `line`, if any.
    pub fn feed(&self, line: &str) -> Option<u64> {
        FRAME_PATTERN
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Frame progress of a single encode stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    total: u64,
    current: u64,
}

impl ProgressState {
    /// Start a stage. A `total` of 0 means unknown; the fraction stays 0.
    pub fn new(total: u64) -> Self {
        Self { total, current: 0 }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Highest frame number seen so far.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Record a parsed frame number and return the updated fraction. Frame
    /// numbers lower than one already seen do not move progress backwards.
    pub fn observe(&mut self, frame: u64) -> f64 {
        self.current = self.current.max(frame);
        self.fraction()
    }

    /// `current / total`, clamped to `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).min(1.0)
    }
}
