//! Frame-count probing with `ffprobe`.
//!
//! Decoding every packet (`-count_frames`) is slow on long inputs but gives
//! an exact count, which the container header does not always carry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use gf_core::{Error, Result};

use crate::runner::{Invocation, ToolRunner};

/// Queries a source file for its total video frame count.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe: PathBuf,
    timeout: Duration,
}

impl MediaProbe {
    pub fn new(ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    /// The inspection command for `source`.
    pub fn invocation(&self, source: &Path) -> Invocation {
        let args = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames",
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ]
        .into_iter()
        .map(String::from)
        .chain(std::iter::once(source.to_string_lossy().into_owned()))
        .collect();

        Invocation::new(self.ffprobe.clone(), args).with_timeout(Some(self.timeout))
    }

    /// Count the frames of the first video stream of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Probe`] if the tool cannot run, exits non-zero, or
    /// prints anything other than a positive integer, and
    /// [`Error::Cancelled`] if `cancel` fires while it runs.
    pub async fn count_frames(
        &self,
        runner: &dyn ToolRunner,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let output = runner
            .capture(&self.invocation(source), cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::probe(format!("failed to run ffprobe: {other}"), ""),
            })?;

        if !output.success() {
            let code = output
                .code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(Error::probe(
                format!("ffprobe exited with status {code}: {}", output.stderr.trim()),
                format!("{}{}", output.stdout, output.stderr),
            ));
        }

        let total = parse_frame_count(&output.stdout)?;
        tracing::debug!("{} has {total} frames", source.display());
        Ok(total)
    }
}

/// Parse the single numeric token printed by the frame-count probe.
///
/// # Errors
///
/// Returns [`Error::Probe`] carrying `raw` if the token is absent,
/// non-numeric, or zero.
pub fn parse_frame_count(raw: &str) -> Result<u64> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::probe("ffprobe printed no frame count", raw));
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::probe(
            format!("unable to determine the total number of frames from '{token}'"),
            raw,
        ));
    }
    match token.parse::<u64>() {
        Ok(0) => Err(Error::probe("source reports zero frames", raw)),
        Ok(total) => Ok(total),
        Err(e) => Err(Error::probe(format!("frame count out of range: {e}"), raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_count() {
        assert_eq!(parse_frame_count("100\n").unwrap(), 100);
        assert_eq!(parse_frame_count("  7  ").unwrap(), 7);
    }

    #[test]
    fn rejects_missing_token() {
        let err = parse_frame_count("\n").unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));
    }

    #[test]
    fn rejects_non_numeric_with_raw_output() {
        match parse_frame_count("N/A\n").unwrap_err() {
            Error::Probe { raw_output, .. } => assert_eq!(raw_output, "N/A\n"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_frame_count("-5").is_err());
        assert!(parse_frame_count("12.5").is_err());
        assert!(parse_frame_count("10\n20").is_err());
    }

    #[test]
    fn rejects_zero() {
        let err = parse_frame_count("0").unwrap_err();
        assert!(err.to_string().contains("zero frames"));
    }

    #[test]
    fn invocation_targets_first_video_stream() {
        let probe = MediaProbe::new("/usr/bin/ffprobe", Duration::from_secs(30));
        let inv = probe.invocation(Path::new("/v/clip.mp4"));
        assert_eq!(inv.program, PathBuf::from("/usr/bin/ffprobe"));
        assert_eq!(
            inv.args,
            vec![
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_frames",
                "-show_entries",
                "stream=nb_read_frames",
                "-of",
                "default=nokey=1:noprint_wrappers=1",
                "/v/clip.mp4",
            ]
        );
        assert_eq!(inv.timeout, Some(Duration::from_secs(30)));
    }
}
