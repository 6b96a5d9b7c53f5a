//! Normalized view of an ffprobe document: the first video stream and the
//! first audio stream, with the fallbacks applied.

use crate::ratio::Ratio;
use shared_utils::{ArchiveError, ProbeOutput, ProbeStream, RatioField, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// Display aspect ratio
    pub aspect: Ratio,
    /// Sample (pixel) aspect ratio
    pub pixel_aspect: Ratio,
    pub interlaced: bool,
    pub frame_rate: Ratio,
}

impl VideoStreamInfo {
    /// Frame rate rounded to whole frames per second.
    pub fn rate(&self) -> i64 {
        self.frame_rate.rounded()
    }

    /// Short label such as `720p30` or `1080i25`.
    pub fn spec(&self) -> String {
        let scan = if self.interlaced { 'i' } else { 'p' };
        format!("{}{}{}", self.height, scan, self.rate())
    }

    fn from_stream(stream: &ProbeStream) -> Result<Self> {
        let codec = stream
            .codec_name
            .clone()
            .ok_or_else(|| ArchiveError::MissingField("codec_name".into()))?;

        let width = dimension(stream.coded_width, stream.width, "width")?;
        let height = dimension(stream.coded_height, stream.height, "height")?;

        let aspect = match optional_ratio(stream.display_aspect_ratio.as_ref())? {
            Some(aspect) => aspect,
            None => Ratio::new(width as i64, height as i64)?,
        };
        let pixel_aspect = match optional_ratio(stream.sample_aspect_ratio.as_ref())? {
            Some(par) => par,
            None => Ratio::new(1, 1)?,
        };

        let interlaced = stream
            .field_order
            .as_deref()
            .is_some_and(|order| order != "progressive");

        let frame_rate = stream
            .r_frame_rate
            .as_ref()
            .ok_or_else(|| ArchiveError::MissingField("r_frame_rate".into()))
            .and_then(ratio_from_field)?;

        Ok(VideoStreamInfo {
            codec,
            width,
            height,
            aspect,
            pixel_aspect,
            interlaced,
            frame_rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub channels: u32,
}

impl AudioStreamInfo {
    fn from_stream(stream: &ProbeStream) -> Result<Self> {
        let codec = stream
            .codec_name
            .clone()
            .ok_or_else(|| ArchiveError::MissingField("codec_name".into()))?;
        let channels = stream
            .channels
            .filter(|&c| c > 0)
            .ok_or_else(|| ArchiveError::MissingField("channels".into()))?;
        Ok(AudioStreamInfo { codec, channels })
    }
}

#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub filename: String,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
    /// The full ffprobe document, kept for verbose dumps.
    pub raw: serde_json::Value,
}

impl MediaMetadata {
    pub fn from_probe(raw: serde_json::Value) -> Result<Self> {
        let parsed = ProbeOutput::from_value(&raw)?;

        let filename = parsed
            .format
            .as_ref()
            .and_then(|f| f.filename.clone())
            .ok_or_else(|| ArchiveError::MissingField("format.filename".into()))?;

        let video = parsed
            .first_stream("video")
            .map(VideoStreamInfo::from_stream)
            .transpose()?;
        let audio = parsed
            .first_stream("audio")
            .map(AudioStreamInfo::from_stream)
            .transpose()?;

        Ok(MediaMetadata {
            filename,
            video,
            audio,
            raw,
        })
    }

    pub fn require_video(&self) -> Result<&VideoStreamInfo> {
        self.video
            .as_ref()
            .ok_or(ArchiveError::MissingStream("video"))
    }

    /// `info\t<file>\t<vcodec>/<spec>\t<acodec>,<channels>`; an absent stream
    /// leaves its column empty.
    pub fn info_line(&self) -> String {
        let video = self
            .video
            .as_ref()
            .map(|v| format!("{}/{}", v.codec, v.spec()))
            .unwrap_or_default();
        let audio = self
            .audio
            .as_ref()
            .map(|a| format!("{},{}", a.codec, a.channels))
            .unwrap_or_default();
        format!("info\t{}\t{}\t{}", self.filename, video, audio)
    }
}

/// Coded size when present and nonzero, else the display size.
fn dimension(coded: Option<u32>, display: Option<u32>, name: &str) -> Result<u32> {
    coded
        .filter(|&v| v > 0)
        .or(display.filter(|&v| v > 0))
        .ok_or_else(|| ArchiveError::MissingField(name.to_string()))
}

fn ratio_from_field(field: &RatioField) -> Result<Ratio> {
    match field {
        RatioField::Text(s) => Ratio::parse(s),
        RatioField::Number(n) => Ratio::from_f64(*n),
    }
}

/// ffprobe writes `0:1` when it does not know an aspect ratio.
fn optional_ratio(field: Option<&RatioField>) -> Result<Option<Ratio>> {
    match field {
        None => Ok(None),
        Some(field) => {
            let ratio = ratio_from_field(field)?;
            Ok((!ratio.is_zero()).then_some(ratio))
        }
    }
}
