//! FFmpeg process management
//!
//! The encoder runs with stderr piped and drained on a separate thread, so a
//! chatty encoder can never fill the pipe buffer and stall. The drained bytes
//! are optionally echoed to our own stderr (verbose runs) and the tail is kept
//! for error reports.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-i", "input.mp4", "output.mkv"]);
//! let outcome = FfmpegProcess::spawn(&mut cmd, false)?.wait()?;
//! if !outcome.status.success() {
//!     eprintln!("{}", outcome.last_stderr_line().unwrap_or_default());
//! }
//! ```

use crate::errors::{ArchiveError, Result};
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Bytes of stderr kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 16 * 1024;

/// Result of a finished encoder run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    pub stderr_tail: String,
}

impl ProcessOutcome {
    /// Last non-empty stderr line; ffmpeg puts its fatal message there.
    pub fn last_stderr_line(&self) -> Option<&str> {
        self.stderr_tail
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
    }
}

pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<Vec<u8>>>,
}

impl FfmpegProcess {
    /// Start `cmd` with stdin closed and stderr drained in the background.
    /// When `echo_stderr` is set the encoder's stderr is passed through live.
    pub fn spawn(cmd: &mut Command, echo_stderr: bool) -> Result<Self> {
        let program = cmd.get_program().to_string_lossy().to_string();
        info!(command = ?cmd, "Executing encoder command");

        cmd.stdin(Stdio::null()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ArchiveError::Encode(format!("could not run {}: {}", program, e)))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ArchiveError::Encode(format!("failed to capture {} stderr", program)))?;

        let stderr_thread = thread::spawn(move || {
            let mut tail: Vec<u8> = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match stderr.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if echo_stderr {
                            let mut out = std::io::stderr().lock();
                            let _ = out.write_all(&chunk[..n]);
                            let _ = out.flush();
                        }
                        tail.extend_from_slice(&chunk[..n]);
                        if tail.len() > STDERR_TAIL_BYTES {
                            let excess = tail.len() - STDERR_TAIL_BYTES;
                            tail.drain(..excess);
                        }
                    }
                }
            }
            tail
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Block until the process exits.
    pub fn wait(mut self) -> Result<ProcessOutcome> {
        let status = self
            .child
            .wait()
            .map_err(|e| ArchiveError::Encode(format!("failed to wait for encoder: {}", e)))?;
        let tail = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();
        let stderr_tail = String::from_utf8_lossy(&tail).into_owned();

        if status.success() {
            info!(exit_code = status.code(), "Encoder process completed successfully");
            debug!(stderr_output = %stderr_tail, "Encoder stderr output");
        } else {
            error!(
                exit_code = status.code(),
                stderr_output = %stderr_tail,
                "Encoder process failed"
            );
        }

        Ok(ProcessOutcome {
            status,
            stderr_tail,
        })
    }
}

/// Run `cmd` to completion and turn a non-zero exit into an encode error.
pub fn run_checked(cmd: &mut Command, echo_stderr: bool) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().to_string();
    let outcome = FfmpegProcess::spawn(cmd, echo_stderr)?.wait()?;
    if outcome.status.success() {
        return Ok(());
    }
    let mut msg = format!("{} failed with {}", program, outcome.status);
    if let Some(line) = outcome.last_stderr_line() {
        msg.push_str(": ");
        msg.push_str(line);
    }
    Err(ArchiveError::Encode(msg))
}
