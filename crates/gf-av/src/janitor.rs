//! Removal of intermediate files.
//!
//! A [`TempArtifact`] owns the path of a scratch file for the duration of a
//! run. [`TempArtifact::cleanup`] removes it and reports what happened;
//! dropping an artifact that was never cleaned up removes it as well, so a
//! panic or early return cannot leave a palette behind.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A non-fatal failure to remove an intermediate file.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.source)
    }
}

/// Result of a cleanup attempt.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The file existed and was deleted.
    Removed,
    /// There was nothing to delete.
    Absent,
    /// Deletion failed; logged and otherwise ignored.
    Failed(CleanupWarning),
}

/// Delete `path` if it exists.
///
/// A missing file is a no-op. Any other error is logged at warn level and
/// returned as [`CleanupOutcome::Failed`]; it is never escalated.
pub fn remove_artifact(path: &Path) -> CleanupOutcome {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed temp artifact {}", path.display());
            CleanupOutcome::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => CleanupOutcome::Absent,
        Err(e) => {
            let warning = CleanupWarning {
                path: path.to_path_buf(),
                source: e,
            };
            tracing::warn!("{warning}");
            CleanupOutcome::Failed(warning)
        }
    }
}

/// Exclusively owned scratch file, removed exactly once.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    cleaned: bool,
}

impl TempArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cleaned: false,
        }
    }

    /// Remove the file now.
    pub fn cleanup(mut self) -> CleanupOutcome {
        self.cleaned = true;
        remove_artifact(&self.path)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.cleaned {
            let _ = remove_artifact(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cleanup_removes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_palette.png");
        fs::write(&path, b"png").unwrap();

        let outcome = TempArtifact::new(&path).cleanup();
        assert!(matches!(outcome, CleanupOutcome::Removed));
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_of_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = TempArtifact::new(dir.path().join("never.png")).cleanup();
        assert!(matches!(outcome, CleanupOutcome::Absent));
    }

    #[test]
    fn other_failures_are_reported_not_raised() {
        // Removing a directory with remove_file fails with something other
        // than NotFound on every platform.
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("palette_dir");
        fs::create_dir(&sub).unwrap();

        match remove_artifact(&sub) {
            CleanupOutcome::Failed(warning) => {
                assert_eq!(warning.path, sub);
                assert!(warning.to_string().contains("failed to remove"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(sub.exists());
    }

    #[test]
    fn drop_removes_uncleaned_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_palette.png");
        fs::write(&path, b"png").unwrap();

        {
            let _artifact = TempArtifact::new(&path);
        }
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_palette.png");
        fs::write(&path, b"png").unwrap();

        let artifact = TempArtifact::new(&path);
        assert!(matches!(artifact.cleanup(), CleanupOutcome::Removed));

        // A file recreated after cleanup belongs to someone else now; the
        // consumed artifact must not touch it on drop.
        fs::write(&path, b"new").unwrap();
        assert!(path.exists());
    }
}
