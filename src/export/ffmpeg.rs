use std::collections::BTreeSet;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use crate::composite::compositor::flatten_onto;
use crate::export::sink::{CaptureConfig, CaptureSink, ExportFormat};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// Answers whether an output format can be produced on this machine.
pub trait CodecProbe {
    /// `format` is encodable, including its audio codec when `with_audio` is set.
    fn supports(&self, format: ExportFormat, with_audio: bool) -> bool;
}

/// Fixed answer, for tests and for callers that already know their platform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedProbe(pub Vec<ExportFormat>);

impl CodecProbe for FixedProbe {
    fn supports(&self, format: ExportFormat, _with_audio: bool) -> bool {
        self.0.contains(&format)
    }
}

/// Probes the encoders compiled into the system `ffmpeg`.
///
/// `ffmpeg -encoders` runs once, on first use.
#[derive(Debug, Default)]
pub struct FfmpegProbe {
    encoders: OnceLock<BTreeSet<String>>,
}

impl FfmpegProbe {
    /// Probe that has not run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder names reported by `ffmpeg`; empty when it is missing.
    pub fn encoders(&self) -> &BTreeSet<String> {
        self.encoders.get_or_init(|| {
            let out = Command::new("ffmpeg")
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output();
            match out {
                Ok(out) if out.status.success() => {
                    let set = parse_encoders(&String::from_utf8_lossy(&out.stdout));
                    tracing::debug!(count = set.len(), "probed ffmpeg encoders");
                    set
                }
                Ok(out) => {
                    tracing::warn!(status = %out.status, "ffmpeg -encoders failed");
                    BTreeSet::new()
                }
                Err(err) => {
                    tracing::warn!(error = %err, "ffmpeg not available");
                    BTreeSet::new()
                }
            }
        })
    }
}

impl CodecProbe for FfmpegProbe {
    fn supports(&self, format: ExportFormat, with_audio: bool) -> bool {
        let (video, audio) = format.encoders();
        let encoders = self.encoders();
        encoders.contains(video) && (!with_audio || encoders.contains(audio))
    }
}

/// Encoder names from `ffmpeg -encoders` output.
///
/// The listing starts after the ` ------` separator; each row is `<flags> <name> <description>`.
pub fn parse_encoders(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            (flags.len() == 6).then(|| name.to_owned())
        })
        .collect()
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file.
    pub out_path: PathBuf,
    /// Replace an existing file.
    pub overwrite: bool,
    /// Color under translucent pixels for formats without alpha.
    pub flatten_color: Rgba8,
}

impl FfmpegSinkOpts {
    /// Overwriting output to `out_path`, flattened over black.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            flatten_color: Rgba8::BLACK,
        }
    }
}

/// Streams raw frames into a system `ffmpeg` process.
///
/// WebM keeps alpha (`yuva420p`); MP4 frames are flattened first. Each presented frame becomes
/// one output frame at the configured rate, so wall-clock pacing does not affect the file.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: Option<CaptureConfig>,
    last_index: Option<usize>,
}

impl FfmpegSink {
    /// Sink writing to `opts.out_path`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_index: None,
        }
    }

    fn command(&self, cfg: &CaptureConfig) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        let (video, audio) = cfg.format.encoders();
        if let Some(input) = cfg.audio.as_ref() {
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &input.sample_rate.to_string(),
                "-ac",
                &input.channels.to_string(),
                "-i",
            ])
            .arg(&input.path)
            .args(["-c:a", audio, "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        cmd.args(["-c:v", video, "-b:v", &cfg.bitrate.to_string()]);
        match cfg.format {
            ExportFormat::WebM => {
                cmd.args(["-pix_fmt", "yuva420p", "-row-mt", "1"]);
            }
            ExportFormat::Mp4 => {
                cmd.args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);
            }
        }
        cmd.arg(&self.opts.out_path);
        cmd
    }

    fn collect_stderr(&mut self) -> String {
        let bytes = match self.stderr_drain.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(err)) => format!("(stderr read failed: {err})").into_bytes(),
                Err(_) => b"(stderr drain thread panicked)".to_vec(),
            },
            None => Vec::new(),
        };
        String::from_utf8_lossy(&bytes).trim().to_owned()
    }
}

impl CaptureSink for FfmpegSink {
    fn begin(&mut self, cfg: CaptureConfig) -> FlipbookResult<()> {
        if cfg.fps == 0 {
            return Err(FlipbookError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(FlipbookError::validation("frame size must be non-zero"));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(FlipbookError::validation(format!(
                "{} output needs even frame dimensions, got {}x{}",
                cfg.format, cfg.width, cfg.height
            )));
        }
        if let Some(audio) = cfg.audio.as_ref()
            && (audio.sample_rate == 0 || audio.channels == 0)
        {
            return Err(FlipbookError::validation(
                "audio sample rate and channel count must be non-zero",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(FlipbookError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(FlipbookError::unsupported(
                "ffmpeg is required for video export, but was not found on PATH",
            ));
        }

        let mut child = self.command(&cfg).spawn().map_err(|e| {
            FlipbookError::export(format!("failed to spawn ffmpeg: {e}"))
        })?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(mut stderr)) = (stdin, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FlipbookError::export("failed to open ffmpeg pipes"));
        };
        self.stderr_drain = Some(std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        }));

        tracing::info!(
            path = %self.opts.out_path.display(),
            format = %cfg.format,
            audio = cfg.audio.is_some(),
            "ffmpeg started"
        );
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.last_index = None;
        Ok(())
    }

    fn present(&mut self, index: usize, frame: &Bitmap, _hold: Duration) -> FlipbookResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FlipbookError::export("ffmpeg sink not started"))?;
        if let Some(last) = self.last_index
            && index <= last
        {
            return Err(FlipbookError::export("frames presented out of order"));
        }
        if frame.width() != cfg.width || frame.height() != cfg.height {
            return Err(FlipbookError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        self.last_index = Some(index);

        let bytes = match cfg.format {
            ExportFormat::WebM => frame.to_straight_rgba8(),
            ExportFormat::Mp4 => flatten_onto(frame, self.opts.flatten_color).data().to_vec(),
        };
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| FlipbookError::export("ffmpeg sink already finished"))?;
        stdin
            .write_all(&bytes)
            .map_err(|e| FlipbookError::export(format!("failed to write frame to ffmpeg: {e}")))
    }

    fn end(&mut self) -> FlipbookResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| FlipbookError::export("ffmpeg sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| FlipbookError::export(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = self.collect_stderr();
        self.cfg = None;
        if !status.success() {
            return Err(FlipbookError::export(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        tracing::info!(path = %self.opts.out_path.display(), "ffmpeg finished");
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            let stderr = self.collect_stderr();
            tracing::info!(stderr = %stderr, "ffmpeg aborted");
            if self.opts.out_path.exists() {
                let _ = std::fs::remove_file(&self.opts.out_path);
            }
        }
        self.cfg = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> FlipbookResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/export/ffmpeg.rs"]
mod tests;
