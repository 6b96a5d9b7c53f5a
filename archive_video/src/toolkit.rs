//! External tool seam: probing and encoding go through [`MediaToolkit`] so the
//! per-file workflow can run against a fake in tests.

use crate::encode_args::EncoderArgs;
use shared_utils::{probe_json, run_checked, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

pub trait MediaToolkit {
    /// Raw ffprobe document (format + streams) for `path`.
    fn probe(&self, path: &Path) -> Result<serde_json::Value>;

    /// Run the encoder to completion. `verbose` passes its stderr through.
    fn encode(&self, args: &EncoderArgs, verbose: bool) -> Result<()>;

    /// Encoder program name as shown to the user.
    fn encoder_name(&self) -> &str {
        "ffmpeg"
    }
}

/// The real ffprobe/ffmpeg pair.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl FfmpegToolkit {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Resolve both tools on PATH. A tool that cannot be found is left as its
    /// bare name so the failure surfaces per file when it is first run.
    pub fn locate() -> Self {
        Self::new(locate_tool("ffprobe"), locate_tool("ffmpeg"))
    }
}

fn locate_tool(name: &str) -> PathBuf {
    match which::which(name) {
        Ok(path) => {
            debug!(tool = name, path = %path.display(), "Found tool");
            path
        }
        Err(e) => {
            warn!(tool = name, error = %e, "Tool not found on PATH");
            PathBuf::from(name)
        }
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn probe(&self, path: &Path) -> Result<serde_json::Value> {
        probe_json(&self.ffprobe, path)
    }

    fn encode(&self, args: &EncoderArgs, verbose: bool) -> Result<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args.as_slice());
        run_checked(&mut cmd, verbose)
    }
}
