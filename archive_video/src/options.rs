/// Video encoder used for the re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// HEVC via libx265
    #[default]
    X265,
    /// H.264 via libx264
    X264,
}

impl VideoCodec {
    /// ffmpeg encoder name
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::X265 => "libx265",
            VideoCodec::X264 => "libx264",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::X265 => "HEVC (x265)",
            VideoCodec::X264 => "H.264 (x264)",
        }
    }
}

/// Run configuration, fixed once the command line is parsed and passed to
/// every per-file workflow.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Print the encoder command but do not run it
    pub dry_run: bool,
    /// Downmix audio to stereo
    pub downmix: bool,
    /// Replace existing output files
    pub overwrite: bool,
    pub verbose: bool,
    pub codec: VideoCodec,
}
