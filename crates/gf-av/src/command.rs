//! Builder for executing external tool commands with timeout support.
//!
//! Two execution modes are provided: [`ToolCommand::output`] captures stdout
//! and stderr to completion (used for probing), and
//! [`ToolCommand::execute_streaming`] hands every status line to a callback
//! as it arrives (used for encoding, where the lines carry progress).

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use gf_core::{Error, Result};

/// Number of trailing output lines kept for error messages.
const TAIL_LINES: usize = 8;

/// Output captured from a tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// How a streamed process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamExit {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// The last few output lines, oldest first.
    pub tail: Vec<String>,
}

impl StreamExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable description of a failed exit.
    pub fn describe(&self) -> String {
        let status = match self.code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        };
        match self.tail.last() {
            Some(last) => format!("{status}: {}", last.trim()),
            None => status,
        }
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use gf_av::ToolCommand;
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// # async fn example() -> gf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "/path/to/video.mp4"])
///     .timeout(Some(Duration::from_secs(30)))
///     .output(None)
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path, with no time limit.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time; `None` waits indefinitely.
    pub fn timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion and capture output, whatever the exit status.
    ///
    /// # Errors
    ///
    /// - [`Error::Tool`] if spawning or waiting fails, or the timeout expires.
    /// - [`Error::Cancelled`] if `cancel` fires first.
    ///
    /// In both of the latter cases the child is killed.
    pub async fn output(&self, cancel: Option<&CancellationToken>) -> Result<ToolOutput> {
        let program_name = self.program_name();

        let child = self
            .command()
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        // Dropping the wait future drops the child, and kill_on_drop kills it.
        let result = tokio::select! {
            res = child.wait_with_output() => res,
            _ = wait_cancelled(cancel) => {
                tracing::info!("Cancelling {program_name}");
                return Err(Error::Cancelled);
            }
            _ = wait_timeout(self.timeout) => {
                return Err(Error::tool(
                    &program_name,
                    format!("timed out after {:?}", self.timeout.unwrap_or_default()),
                ));
            }
        };

        let output = result.map_err(|e| {
            Error::tool(&program_name, format!("I/O error waiting for process: {e}"))
        })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Execute the command, passing each line of combined stdout and stderr
    /// to `on_line` as soon as it is read.
    ///
    /// Lines are split on both `\n` and `\r`, since ffmpeg redraws its status
    /// line with carriage returns. A non-zero exit is reported through the
    /// returned [`StreamExit`], not as an error.
    ///
    /// # Errors
    ///
    /// - [`Error::Tool`] if spawning fails, reading fails, or the timeout
    ///   expires.
    /// - [`Error::Cancelled`] if `cancel` fires first.
    ///
    /// In both of the latter cases the child is killed before returning.
    pub async fn execute_streaming(
        &self,
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: Option<&CancellationToken>,
    ) -> Result<StreamExit> {
        let program_name = self.program_name();

        let mut child = self
            .command()
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool(&program_name, "failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool(&program_name, "failed to capture stderr"))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);

        let outcome = {
            let pump = async {
                let mut out = StatusLines::new(stdout);
                let mut err = StatusLines::new(stderr);
                let (mut out_done, mut err_done) = (false, false);

                while !(out_done && err_done) {
                    let line = tokio::select! {
                        line = out.next_line(), if !out_done => line,
                        line = err.next_line(), if !err_done => line,
                    };
                    match line {
                        Ok(Some(line)) => {
                            on_line(&line);
                            if tail.len() == TAIL_LINES {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                        Ok(None) => {
                            out_done = out.is_finished();
                            err_done = err.is_finished();
                        }
                        Err(e) => return Err(e),
                    }
                }
                child.wait().await
            };

            tokio::select! {
                res = pump => Outcome::Exited(res),
                _ = wait_cancelled(cancel) => Outcome::Cancelled,
                _ = wait_timeout(self.timeout) => Outcome::TimedOut,
            }
        };

        match outcome {
            Outcome::Exited(Ok(status)) => Ok(StreamExit {
                code: status.code(),
                tail: tail.into_iter().collect(),
            }),
            Outcome::Exited(Err(e)) => {
                let _ = child.kill().await;
                Err(Error::tool(program_name, format!("I/O error reading output: {e}")))
            }
            Outcome::Cancelled => {
                tracing::info!("Cancelling {program_name}");
                let _ = child.kill().await;
                Err(Error::Cancelled)
            }
            Outcome::TimedOut => {
                let _ = child.kill().await;
                Err(Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout.unwrap_or_default()),
                ))
            }
        }
    }
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

async fn wait_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn wait_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Line splitting
// ---------------------------------------------------------------------------

/// Splits a byte stream into non-empty lines on `\n` or `\r`.
///
/// `next_line` is cancel-safe: a dropped call loses no data, which lets two
/// readers share one `select!` loop.
pub(crate) struct StatusLines<R> {
    reader: R,
    partial: Vec<u8>,
    ready: VecDeque<String>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> StatusLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            partial: Vec::new(),
            ready: VecDeque::new(),
            eof: false,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.eof && self.ready.is_empty()
    }

    pub(crate) async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
                self.flush_partial();
                continue;
            }

            for &byte in &chunk[..n] {
                if byte == b'\n' || byte == b'\r' {
                    self.flush_partial();
                } else {
                    self.partial.push(byte);
                }
            }
        }
    }

    fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.ready.push_back(line);
        }
    }
}
