//! archive-video - batch re-encoding of video files for archival
//!
//! Each input is probed with ffprobe, re-encoded with ffmpeg to a Matroska
//! file next to it (HEVC by default, H.264 on request, AAC audio, at most
//! 720 lines with square pixels), and the original is moved to a
//! `Duplicates/` directory beside the output.
//!
//! ```rust,ignore
//! use archive_video::{run_batch, FfmpegToolkit, Mode, Options};
//! use std::path::PathBuf;
//!
//! let toolkit = FfmpegToolkit::locate();
//! let files = vec![PathBuf::from("holiday.mp4")];
//! let summary = run_batch(&toolkit, &files, Mode::Transcode, &Options::default(), &mut std::io::stdout());
//! ```

pub mod encode_args;
pub mod metadata;
pub mod options;
pub mod ratio;
pub mod target;
pub mod toolkit;
pub mod workflow;

// Re-exports
pub use encode_args::{build_args, scale_override, EncoderArgs, ScaleOverride};
pub use metadata::{AudioStreamInfo, MediaMetadata, VideoStreamInfo};
pub use options::{Options, VideoCodec};
pub use ratio::Ratio;
pub use target::target_filename;
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use workflow::{info, run_batch, transcode, BatchSummary, Mode, TranscodeOutcome};

pub use shared_utils::{ArchiveError, ErrorCategory, Result};
