use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of [`ArchiveError`], used by callers and tests that
/// only care about which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Probe,
    MissingStream,
    Validation,
    Encode,
    Io,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("invalid ratio '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("ffprobe output is missing field '{0}'")]
    MissingField(String),

    #[error("no {0} stream found")]
    MissingStream(&'static str),

    #[error("target is the same as source")]
    SameAsSource,

    #[error("already exists")]
    TargetExists(PathBuf),

    #[error("cannot derive target name, no file extension: {0}")]
    NoExtension(PathBuf),

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("{0}")]
    Encode(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ArchiveError::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ArchiveError::Parse { .. } => ErrorCategory::Parse,
            ArchiveError::Probe(_) | ArchiveError::MissingField(_) => ErrorCategory::Probe,
            ArchiveError::MissingStream(_) => ErrorCategory::MissingStream,
            ArchiveError::SameAsSource
            | ArchiveError::TargetExists(_)
            | ArchiveError::NoExtension(_)
            | ArchiveError::InvalidPath(_) => ErrorCategory::Validation,
            ArchiveError::Encode(_) => ErrorCategory::Encode,
            ArchiveError::Io { .. } => ErrorCategory::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
