//! ffmpeg argument construction.
//!
//! Each concern (input/global flags, deinterlacing, size and aspect, video
//! codec, audio) is a separate function returning its own argument group;
//! [`build_args`] concatenates them in ffmpeg's expected order and appends
//! the output path.

use crate::metadata::{MediaMetadata, VideoStreamInfo};
use crate::options::{Options, VideoCodec};
use crate::ratio::Ratio;
use shared_utils::{path_to_str_safe, Result};
use std::path::Path;

/// Output frames are at most this many lines high.
pub const MAX_HEIGHT: i64 = 720;
/// libx264 bitrate cap for sources below [`MAX_HEIGHT`]
pub const X264_SD_BITRATE: &str = "1000k";
pub const AAC_ENCODER: &str = "libfdk_aac";
pub const DOWNMIX_CHANNELS: &str = "2";
pub const DOWNMIX_BITRATE: &str = "96k";
/// libfdk_aac VBR mode used when channels are kept
pub const AAC_VBR_LEVEL: &str = "2";

/// Arguments for one encoder invocation (program name excluded).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncoderArgs {
    args: Vec<String>,
}

impl EncoderArgs {
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }

    /// Shell-quoted `program args...`, safe to paste into a terminal.
    pub fn command_line(&self, program: &str) -> String {
        shell_words::join(std::iter::once(program).chain(self.iter()))
    }

    /// True when `flag` appears as an argument on its own.
    pub fn contains(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Argument following `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    fn extend<I, S>(&mut self, group: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(group.into_iter().map(Into::into));
    }
}

/// Explicit output size, emitted only when it differs from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleOverride {
    pub width: i64,
    pub height: i64,
    pub aspect: Ratio,
}

/// Cap the height at [`MAX_HEIGHT`] (width follows the display aspect), then
/// correct non-square pixels. `None` when the frame size stays unchanged.
pub fn scale_override(video: &VideoStreamInfo) -> Result<Option<ScaleOverride>> {
    let (orig_width, orig_height) = (video.width as i64, video.height as i64);
    let (mut width, mut height) = (orig_width, orig_height);

    if height > MAX_HEIGHT {
        height = MAX_HEIGHT;
        width = video.aspect.mul_round(height);
    }

    let par = video.pixel_aspect;
    if !par.is_one() {
        if par < Ratio::new(1, 1)? {
            width = par.mul_round(width);
        } else if let Some(h) = par.div_round(height) {
            height = h;
        }
    }

    if width == orig_width && height == orig_height {
        return Ok(None);
    }

    Ok(Some(ScaleOverride {
        width,
        height,
        aspect: Ratio::new(width, height)?,
    }))
}

fn global_args(input: &str, options: &Options) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-i".into(),
        input.into(),
        "-threads".into(),
        "0".into(),
        "-hide_banner".into(),
    ];
    if !options.verbose {
        args.extend(["-loglevel".into(), "panic".into()]);
    }
    if options.overwrite {
        args.push("-y".into());
    }
    args
}

fn deinterlace_args(video: &VideoStreamInfo) -> Vec<String> {
    if video.interlaced {
        vec!["-deinterlace".into()]
    } else {
        Vec::new()
    }
}

fn scale_args(video: &VideoStreamInfo) -> Result<Vec<String>> {
    Ok(match scale_override(video)? {
        Some(s) => vec![
            "-s".into(),
            format!("{}x{}", s.width, s.height),
            "-aspect".into(),
            s.aspect.as_aspect(),
        ],
        None => Vec::new(),
    })
}

fn video_codec_args(video: &VideoStreamInfo, options: &Options) -> Vec<String> {
    let mut args: Vec<String> = vec!["-vcodec".into(), options.codec.encoder().into()];
    match options.codec {
        VideoCodec::X265 => {
            if !options.verbose {
                args.extend(["-x265-params".into(), "log-level=error".into()]);
            }
        }
        VideoCodec::X264 => {
            args.extend([
                "-tune".into(),
                "film".into(),
                "-profile".into(),
                "main".into(),
            ]);
            if (video.height as i64) < MAX_HEIGHT {
                args.extend(["-b:v".into(), X264_SD_BITRATE.into()]);
            }
        }
    }
    args
}

fn audio_args(options: &Options) -> Vec<String> {
    if options.downmix {
        vec![
            "-c:a".into(),
            AAC_ENCODER.into(),
            "-ac".into(),
            DOWNMIX_CHANNELS.into(),
            "-ab".into(),
            DOWNMIX_BITRATE.into(),
        ]
    } else {
        vec![
            "-c:a".into(),
            AAC_ENCODER.into(),
            "-vbr".into(),
            AAC_VBR_LEVEL.into(),
        ]
    }
}

/// Full ffmpeg argument list for re-encoding `meta` into `target`.
/// Fails with a missing-stream error when there is no video stream.
pub fn build_args(meta: &MediaMetadata, target: &Path, options: &Options) -> Result<EncoderArgs> {
    let video = meta.require_video()?;
    let target = path_to_str_safe(target)?;

    let mut args = EncoderArgs::default();
    args.extend(global_args(&meta.filename, options));
    args.extend(deinterlace_args(video));
    args.extend(scale_args(video)?);
    args.extend(video_codec_args(video, options));
    args.extend(audio_args(options));
    args.extend([target]);
    Ok(args)
}
