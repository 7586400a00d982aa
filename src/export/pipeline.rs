//! Export pipeline: composite every frame in sequence and present it to a capture sink.
//!
//! Format negotiation happens before anything is allocated. Once the sink has begun, any
//! failure aborts it, and the staged audio mix is removed on every exit path.

use std::time::{Duration, Instant};

use crate::composite::compositor::Background;
use crate::document::project::AudioTrack;
use crate::document::store::LayerStore;
use crate::export::audio::{AudioDecoder, FfmpegAudioDecoder, prepare_mix};
use crate::export::ffmpeg::{CodecProbe, FfmpegProbe};
use crate::export::sink::{CaptureConfig, CaptureSink, ExportFormat};
use crate::foundation::core::{Rgba8, frame_interval};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// How frames are released to the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pacing {
    /// Hold each frame for `1000 / fps` ms of wall-clock time.
    #[default]
    RealTime,
    /// Push frames as fast as the sink accepts them.
    Immediate,
}

/// Export options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOpts {
    /// Formats to try, most preferred first.
    pub formats: Vec<ExportFormat>,
    /// Video bitrate in bits per second.
    pub bitrate: u32,
    /// Solid background; `None` uses the document background (image or white).
    pub background: Option<Rgba8>,
    /// Frame release timing.
    pub pacing: Pacing,
    /// Mix the audio tracks into the output.
    pub audio: bool,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            formats: ExportFormat::PREFERRED.to_vec(),
            bitrate: 2_500_000,
            background: None,
            pacing: Pacing::RealTime,
            audio: true,
        }
    }
}

/// What an export produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportReport {
    /// Negotiated format.
    pub format: ExportFormat,
    /// Frames presented.
    pub frames: usize,
    /// Timeline length.
    pub duration: Duration,
    /// Whether a soundtrack was attached.
    pub audio: bool,
}

/// Pick the first preferred format the probe accepts.
pub fn negotiate_format(
    preferred: &[ExportFormat],
    probe: &dyn CodecProbe,
    with_audio: bool,
) -> FlipbookResult<ExportFormat> {
    if let Some(format) = preferred.iter().copied().find(|f| probe.supports(*f, with_audio)) {
        if preferred.first() != Some(&format) {
            tracing::info!(%format, "preferred export format unavailable, falling back");
        }
        return Ok(format);
    }
    let names: Vec<String> = preferred.iter().map(ToString::to_string).collect();
    Err(FlipbookError::unsupported(format!(
        "none of the export formats [{}] is supported",
        names.join(", ")
    )))
}

/// Aborts the sink unless disarmed by a clean finish.
struct SinkGuard<'a> {
    sink: &'a mut dyn CaptureSink,
    armed: bool,
}

impl SinkGuard<'_> {
    fn finish(mut self) -> FlipbookResult<()> {
        self.sink.end()?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::info!("export failed, aborting capture");
            self.sink.abort();
        }
    }
}

/// Drives the compositor over a document and feeds a capture sink.
pub struct Exporter<'a> {
    opts: ExportOpts,
    probe: &'a dyn CodecProbe,
    decoder: &'a dyn AudioDecoder,
}

static FFMPEG_PROBE: std::sync::OnceLock<FfmpegProbe> = std::sync::OnceLock::new();

impl Exporter<'static> {
    /// Exporter probing and decoding through the system `ffmpeg`.
    pub fn new(opts: ExportOpts) -> Self {
        Self {
            opts,
            probe: FFMPEG_PROBE.get_or_init(FfmpegProbe::new),
            decoder: &FfmpegAudioDecoder,
        }
    }
}

impl<'a> Exporter<'a> {
    /// Replace the codec probe.
    pub fn with_probe<'b>(self, probe: &'b dyn CodecProbe) -> Exporter<'b>
    where
        'a: 'b,
    {
        Exporter {
            opts: self.opts,
            probe,
            decoder: self.decoder,
        }
    }

    /// Replace the audio decoder.
    pub fn with_decoder<'b>(self, decoder: &'b dyn AudioDecoder) -> Exporter<'b>
    where
        'a: 'b,
    {
        Exporter {
            opts: self.opts,
            probe: self.probe,
            decoder,
        }
    }

    /// Options in use.
    pub fn opts(&self) -> &ExportOpts {
        &self.opts
    }

    /// Format this exporter would produce for a document with or without audio.
    pub fn format(&self, with_audio: bool) -> FlipbookResult<ExportFormat> {
        negotiate_format(&self.opts.formats, self.probe, with_audio && self.opts.audio)
    }

    fn background(&self, store: &LayerStore) -> Background {
        match self.opts.background {
            Some(color) => Background::Solid(color),
            None => store.background(),
        }
    }

    /// Export every frame of `store` at `fps`.
    ///
    /// `progress` receives the percentage of frames presented after each frame.
    #[tracing::instrument(skip_all, fields(frames = store.frames().len(), fps = fps))]
    pub fn run(
        &self,
        store: &LayerStore,
        fps: u32,
        audio_tracks: &[AudioTrack],
        sink: &mut dyn CaptureSink,
        mut progress: impl FnMut(u8),
    ) -> FlipbookResult<ExportReport> {
        if fps == 0 {
            return Err(FlipbookError::validation("fps must be > 0"));
        }
        let frames = store.frames();
        let total = frames.len();
        let wants_audio = self.opts.audio && audio_tracks.iter().any(|t| !t.muted);
        let format = negotiate_format(&self.opts.formats, self.probe, wants_audio)?;

        let hold = frame_interval(fps);
        let duration = hold * u32::try_from(total).unwrap_or(u32::MAX);
        let mix = if wants_audio {
            prepare_mix(audio_tracks, self.decoder, duration)?
        } else {
            None
        };

        let size = store.canvas_size();
        let background = self.background(store);
        tracing::info!(%format, total, audio = mix.is_some(), "export started");

        let mut guard = SinkGuard { sink, armed: true };
        guard.sink.begin(CaptureConfig {
            width: size.width,
            height: size.height,
            fps,
            format,
            bitrate: self.opts.bitrate,
            audio: mix.as_ref().map(|m| m.input()),
        })?;

        let mut surface = Bitmap::blank(size);
        let start = Instant::now();
        for (index, frame) in frames.iter().enumerate() {
            let composed = store
                .composite(frame.id, &background)
                .ok_or_else(|| FlipbookError::export(format!("frame {index} vanished during export")))?;
            surface.data_mut().copy_from_slice(composed.data());
            guard.sink.present(index, &surface, hold)?;

            if self.opts.pacing == Pacing::RealTime {
                let deadline = start + hold * u32::try_from(index + 1).unwrap_or(u32::MAX);
                if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
                    std::thread::sleep(wait);
                }
            }
            progress(((index + 1) * 100 / total.max(1)) as u8);
        }
        guard.finish()?;
        let audio = mix.is_some();
        drop(mix);

        tracing::info!(%format, total, "export finished");
        Ok(ExportReport {
            format,
            frames: total,
            duration,
            audio,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
