//! The process-spawning seam.
//!
//! Everything above this module describes work as an [`Invocation`] and hands
//! it to a [`ToolRunner`]. [`ProcessRunner`] spawns real processes through
//! [`ToolCommand`]; tests substitute a recording implementation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gf_core::Result;

use crate::command::{StreamExit, ToolCommand, ToolOutput};

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable path.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Maximum run time; `None` is unbounded.
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|a| {
                if a.contains(' ') {
                    format!("'{a}'")
                } else {
                    a.clone()
                }
            }))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.args(self.args.iter().cloned()).timeout(self.timeout);
        cmd
    }
}

/// Runs [`Invocation`]s.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion and capture output, whatever the exit status.
    ///
    /// A fired `cancel` kills the process and yields
    /// [`gf_core::Error::Cancelled`].
    async fn capture(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput>;

    /// Run while feeding every line of combined stdout/stderr to `on_line`.
    async fn stream(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancellationToken,
    ) -> Result<StreamExit>;
}

/// [`ToolRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn capture(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        tracing::debug!("capture: {}", invocation.command_line());
        invocation.to_command().output(Some(cancel)).await
    }

    async fn stream(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancellationToken,
    ) -> Result<StreamExit> {
        tracing::info!("spawn: {}", invocation.command_line());
        invocation
            .to_command()
            .execute_streaming(on_line, Some(cancel))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_spaced_args() {
        let inv = Invocation::new(
            PathBuf::from("/usr/bin/ffmpeg"),
            vec!["-lavfi".into(), "scale=800:-1 [x]".into()],
        );
        assert_eq!(inv.command_line(), "/usr/bin/ffmpeg -lavfi 'scale=800:-1 [x]'");
    }

    #[test]
    fn with_timeout_sets_limit() {
        let inv = Invocation::new(PathBuf::from("ffprobe"), vec![])
            .with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(inv.timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn process_runner_captures() {
        let inv = Invocation::new(PathBuf::from("echo"), vec!["42".into()]);
        if let Ok(out) = ProcessRunner.capture(&inv, &CancellationToken::new()).await {
            assert!(out.success());
            assert_eq!(out.stdout.trim(), "42");
        }
    }

    #[tokio::test]
    async fn process_runner_streams() {
        let inv = Invocation::new(
            PathBuf::from("sh"),
            vec!["-c".into(), "echo frame=5; exit 0".into()],
        );
        let mut lines = Vec::new();
        let token = CancellationToken::new();
        let result = ProcessRunner
            .stream(&inv, &mut |l: &str| lines.push(l.to_string()), &token)
            .await;
        if let Ok(exit) = result {
            assert!(exit.success());
            assert_eq!(lines, vec!["frame=5"]);
        }
    }
}
