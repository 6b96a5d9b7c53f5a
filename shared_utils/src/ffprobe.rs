//! FFprobe wrapper module
//!
//! Runs ffprobe with JSON output and exposes both the raw document (for
//! verbose dumps) and typed serde views of the `format` and `streams`
//! sections. Interpretation of the values is left to the caller.

use crate::errors::{ArchiveError, Result};
use crate::path_validator::path_to_str_safe;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// A ratio-like field as ffprobe reports it: usually a string such as
/// `"16:9"` or `"30000/1001"`, occasionally a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RatioField {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub coded_width: Option<u32>,
    #[serde(default)]
    pub coded_height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub display_aspect_ratio: Option<RatioField>,
    #[serde(default)]
    pub sample_aspect_ratio: Option<RatioField>,
    #[serde(default)]
    pub field_order: Option<String>,
    #[serde(default)]
    pub r_frame_rate: Option<RatioField>,
    #[serde(default)]
    pub channels: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub format: Option<ProbeFormat>,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

impl ProbeOutput {
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        ProbeOutput::deserialize(value).map_err(|e| ArchiveError::Probe(e.to_string()))
    }

    /// First stream of the given `codec_type` ("video", "audio", ...).
    pub fn first_stream(&self, codec_type: &str) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
    }
}

/// Run `ffprobe -v quiet -print_format json -show_format -show_streams` on
/// `path` and return the parsed document.
pub fn probe_json(ffprobe: &Path, path: &Path) -> Result<serde_json::Value> {
    let path_str = path_to_str_safe(path)?;

    debug!(tool = %ffprobe.display(), input = path_str, "Probing media file");

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            path_str,
        ])
        .output()
        .map_err(|e| ArchiveError::Probe(format!("could not run {}: {}", ffprobe.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let msg = if stderr.trim().is_empty() {
            format!("{} exited with {}", ffprobe.display(), output.status)
        } else {
            stderr.trim().to_string()
        };
        return Err(ArchiveError::Probe(msg));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| ArchiveError::Probe(e.to_string()))
}
