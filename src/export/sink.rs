use std::path::PathBuf;
use std::time::Duration;

use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// Output container and codec pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// WebM with VP9 video and Opus audio.
    WebM,
    /// MP4 with H.264 video and AAC audio.
    Mp4,
}

impl ExportFormat {
    /// Preference order used when nothing else is configured.
    pub const PREFERRED: [ExportFormat; 2] = [ExportFormat::WebM, ExportFormat::Mp4];

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Mp4 => "mp4",
        }
    }

    /// MIME type of the container.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebM => "video/webm;codecs=vp9",
            Self::Mp4 => "video/mp4;codecs=avc1",
        }
    }

    /// `ffmpeg` encoder names for the video and audio streams.
    pub fn encoders(self) -> (&'static str, &'static str) {
        match self {
            Self::WebM => ("libvpx-vp9", "libopus"),
            Self::Mp4 => ("libx264", "aac"),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webm" | "vp9" => Ok(Self::WebM),
            "mp4" | "h264" => Ok(Self::Mp4),
            other => Err(FlipbookError::validation(format!("unknown export format '{other}'"))),
        }
    }
}

/// Mixed PCM handed to a sink alongside the frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioInput {
    /// Interleaved little-endian `f32` samples.
    pub path: PathBuf,
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Stream parameters fixed at [`CaptureSink::begin`].
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Negotiated output format.
    pub format: ExportFormat,
    /// Target video bitrate in bits per second.
    pub bitrate: u32,
    /// Optional soundtrack.
    pub audio: Option<AudioInput>,
}

/// Consumer of presented export frames.
///
/// Call order: `begin` once, `present` for each frame in sequence, then exactly one of `end` or
/// `abort`. `abort` must release everything the sink acquired and is safe to call at any point,
/// including before `begin`.
pub trait CaptureSink: Send {
    /// Allocate the output stream.
    fn begin(&mut self, cfg: CaptureConfig) -> FlipbookResult<()>;
    /// Present frame `index` for `hold` (premultiplied RGBA8).
    fn present(&mut self, index: usize, frame: &Bitmap, hold: Duration) -> FlipbookResult<()>;
    /// Finish the stream.
    fn end(&mut self) -> FlipbookResult<()>;
    /// Tear down after a failure.
    fn abort(&mut self);
}

/// One presented frame.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    /// Timeline index.
    pub index: usize,
    /// How long the frame was presented for.
    pub hold: Duration,
    /// Composited pixels.
    pub bitmap: Bitmap,
}

/// Sink that keeps frames in memory, for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<CaptureConfig>,
    frames: Vec<CapturedFrame>,
    fail_at: Option<usize>,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose `present` fails for frame `index`.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    /// Configuration received in `begin`; kept after `abort` for inspection.
    pub fn config(&self) -> Option<&CaptureConfig> {
        self.cfg.as_ref()
    }

    /// Frames presented so far, in order.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    /// `end` completed.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// `abort` was called.
    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl CaptureSink for InMemorySink {
    fn begin(&mut self, cfg: CaptureConfig) -> FlipbookResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        self.aborted = false;
        Ok(())
    }

    fn present(&mut self, index: usize, frame: &Bitmap, hold: Duration) -> FlipbookResult<()> {
        if self.cfg.is_none() || self.aborted {
            return Err(FlipbookError::export("sink not started"));
        }
        if self.fail_at == Some(index) {
            return Err(FlipbookError::export(format!("capture failed at frame {index}")));
        }
        self.frames.push(CapturedFrame {
            index,
            hold,
            bitmap: frame.clone(),
        });
        Ok(())
    }

    fn end(&mut self) -> FlipbookResult<()> {
        if self.cfg.is_none() || self.aborted {
            return Err(FlipbookError::export("sink not started"));
        }
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
