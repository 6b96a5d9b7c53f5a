//! Shared utilities for archive-video
//!
//! Tool plumbing that is independent of the re-encoding decisions:
//! - Error type and result alias
//! - FFprobe wrapper (raw JSON + typed views)
//! - FFmpeg process runner (stderr drained off-thread)
//! - Path conversion and same-file checks
//! - tracing-based logging setup

pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod path_validator;

pub use errors::{ArchiveError, ErrorCategory, Result};
pub use ffmpeg_process::{run_checked, FfmpegProcess, ProcessOutcome};
pub use ffprobe::{probe_json, ProbeFormat, ProbeOutput, ProbeStream, RatioField};
pub use path_validator::{is_same_file, path_to_str_safe};
