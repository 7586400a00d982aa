//! Soundtrack preparation: decode every audio track, mix them into one stream and stage the
//! result as a raw PCM file for the capture sink.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::document::project::AudioTrack;
use crate::export::sink::AudioInput;
use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Mix sample rate in Hz.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Mix channel count (interleaved stereo).
pub const MIX_CHANNELS: u16 = 2;

/// Turns an audio file into interleaved stereo `f32` samples at a given rate.
pub trait AudioDecoder: Sync {
    /// Decode `path`, resampled to `sample_rate`.
    fn decode(&self, path: &Path, sample_rate: u32) -> FlipbookResult<Vec<f32>>;
}

/// Decodes through the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioDecoder;

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode(&self, path: &Path, sample_rate: u32) -> FlipbookResult<Vec<f32>> {
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                &MIX_CHANNELS.to_string(),
                "-ar",
                &sample_rate.to_string(),
                "pipe:1",
            ])
            .output()
            .map_err(|e| FlipbookError::decode(format!("failed to run ffmpeg for audio decode: {e}")))?;

        if !out.status.success() {
            let msg = String::from_utf8_lossy(&out.stderr);
            return Err(FlipbookError::decode(format!(
                "audio decode failed for '{}': {}",
                path.display(),
                msg.trim()
            )));
        }
        pcm_from_f32le(&out.stdout)
    }
}

fn pcm_from_f32le(bytes: &[u8]) -> FlipbookResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(FlipbookError::decode(
            "decoded audio length is not a whole number of f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// A decoded track ready to mix.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedTrack {
    /// Timeline start in milliseconds; negative trims the head.
    pub offset_ms: i64,
    /// Linear gain.
    pub volume: f32,
    /// Interleaved stereo samples at [`MIX_SAMPLE_RATE`].
    pub samples: Vec<f32>,
}

/// Decode all unmuted tracks concurrently.
///
/// A track that fails to decode is skipped with a warning; the others are still returned, in
/// track order.
#[tracing::instrument(level = "debug", skip_all, fields(tracks = tracks.len()))]
pub fn decode_tracks(tracks: &[AudioTrack], decoder: &dyn AudioDecoder) -> Vec<DecodedTrack> {
    let active: Vec<&AudioTrack> = tracks.iter().filter(|t| !t.muted).collect();
    let results: Vec<(&AudioTrack, FlipbookResult<Vec<f32>>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = active
            .iter()
            .map(|&track| {
                let handle = scope.spawn(move || decoder.decode(&track.path, MIX_SAMPLE_RATE));
                (track, handle)
            })
            .collect();
        handles
            .into_iter()
            .map(|(track, handle)| {
                let res = handle
                    .join()
                    .unwrap_or_else(|_| Err(FlipbookError::decode("audio decode thread panicked")));
                (track, res)
            })
            .collect()
    });

    results
        .into_iter()
        .filter_map(|(track, res)| match res {
            Ok(samples) => Some(DecodedTrack {
                offset_ms: track.offset_ms,
                volume: track.volume,
                samples,
            }),
            Err(err) => {
                tracing::warn!(track = %track.name, error = %err, "audio track skipped");
                None
            }
        })
        .collect()
}

/// Sample-frame index of a timeline position in milliseconds (may be negative).
fn ms_to_frames(ms: i64) -> i64 {
    ms * i64::from(MIX_SAMPLE_RATE) / 1000
}

/// Mix tracks into `duration` of interleaved stereo, clamped to [-1, 1].
///
/// Each track starts at its offset and is scaled by its volume; anything past the end is cut.
pub fn mix(tracks: &[DecodedTrack], duration: Duration) -> Vec<f32> {
    let channels = usize::from(MIX_CHANNELS);
    let total_frames =
        (duration.as_secs_f64() * f64::from(MIX_SAMPLE_RATE)).round() as usize;
    let mut out = vec![0.0f32; total_frames * channels];

    for track in tracks {
        let offset = ms_to_frames(track.offset_ms);
        // A negative offset skips that many source frames.
        let (dst_start, src_skip) = if offset >= 0 {
            (offset as usize, 0)
        } else {
            (0, offset.unsigned_abs() as usize)
        };
        if dst_start >= total_frames {
            continue;
        }
        let src = track.samples.get(src_skip * channels..).unwrap_or(&[]);
        let dst = &mut out[dst_start * channels..];
        for (d, s) in dst.iter_mut().zip(src) {
            *d += s * track.volume;
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

/// Write interleaved samples as raw little-endian `f32`.
pub fn write_f32le(samples: &[f32], path: &Path) -> FlipbookResult<()> {
    use anyhow::Context as _;
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write audio mix '{}'", path.display()))?;
    Ok(())
}

/// A staged mix file, removed when dropped.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
}

impl TempAudioFile {
    /// Fresh path in the system temp directory.
    fn reserve() -> Self {
        let path = std::env::temp_dir().join(format!(
            "flipbook_audio_mix_{}_{}.f32le",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        Self { path }
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sink input describing this file.
    pub fn input(&self) -> AudioInput {
        AudioInput {
            path: self.path.clone(),
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
        }
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        if self.path.exists()
            && let Err(err) = std::fs::remove_file(&self.path)
        {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to remove audio mix");
        }
    }
}

/// Decode, mix and stage the soundtrack for a video of `duration`.
///
/// `None` when no track is unmuted or none of them decoded.
pub fn prepare_mix(
    tracks: &[AudioTrack],
    decoder: &dyn AudioDecoder,
    duration: Duration,
) -> FlipbookResult<Option<TempAudioFile>> {
    if tracks.iter().all(|t| t.muted) {
        return Ok(None);
    }
    let decoded = decode_tracks(tracks, decoder);
    if decoded.is_empty() {
        return Ok(None);
    }
    let mixed = mix(&decoded, duration);
    let file = TempAudioFile::reserve();
    write_f32le(&mixed, file.path())?;
    tracing::debug!(tracks = decoded.len(), samples = mixed.len(), "audio mix staged");
    Ok(Some(file))
}

#[cfg(test)]
#[path = "../../tests/unit/export/audio.rs"]
mod tests;
