use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use flipbook::{
    ExportFormat, ExportOpts, Exporter, FfmpegSink, FfmpegSinkOpts, Pacing, Project, Rgba8,
};

#[derive(Parser, Debug)]
#[command(name = "flipbook", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a project as a video (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print a project summary.
    Info(InfoArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Webm,
    Mp4,
}

impl From<FormatChoice> for ExportFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Webm => ExportFormat::WebM,
            FormatChoice::Mp4 => ExportFormat::Mp4,
        }
    }
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Required format. Without it WebM is preferred and MP4 is the fallback.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Video bitrate in bits per second.
    #[arg(long, default_value_t = 2_500_000)]
    bitrate: u32,

    /// Hold each frame for its real duration instead of encoding as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// Leave the audio tracks out.
    #[arg(long)]
    no_audio: bool,

    /// Solid background color (#rrggbb or #rrggbbaa) instead of the project background.
    #[arg(long)]
    background: Option<Rgba8>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    index: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn read_project(path: &Path) -> anyhow::Result<Project> {
    Project::read_file(path).with_context(|| format!("load project '{}'", path.display()))
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = read_project(&args.in_path)?;
    let store = project.to_store()?;

    let opts = ExportOpts {
        formats: match args.format {
            Some(f) => vec![f.into()],
            None => ExportFormat::PREFERRED.to_vec(),
        },
        bitrate: args.bitrate,
        background: args.background,
        pacing: if args.realtime {
            Pacing::RealTime
        } else {
            Pacing::Immediate
        },
        audio: !args.no_audio,
    };
    let exporter = Exporter::new(opts);
    let format = exporter.format(!project.audio_tracks.is_empty())?;
    if args.out.extension().and_then(|e| e.to_str()) != Some(format.extension()) {
        eprintln!(
            "note: writing {} into '{}'",
            format.mime_type(),
            args.out.display()
        );
    }

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        flatten_color: args.background.unwrap_or(Rgba8::WHITE),
        ..FfmpegSinkOpts::new(&args.out)
    });
    let mut last = None;
    let report = exporter
        .run(&store, project.fps, &project.audio_tracks, &mut sink, |pct| {
            if last != Some(pct / 10) {
                last = Some(pct / 10);
                eprint!("\r{pct:3}%");
            }
        })?;
    eprintln!();

    eprintln!(
        "wrote {} ({} frames, {:.2}s, {}{})",
        args.out.display(),
        report.frames,
        report.duration.as_secs_f64(),
        report.format,
        if report.audio { ", with audio" } else { "" }
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = read_project(&args.in_path)?;
    let store = project.to_store()?;
    let frame = store
        .frames()
        .get(args.index)
        .with_context(|| {
            format!(
                "frame {} out of range (project has {} frames)",
                args.index,
                store.frames().len()
            )
        })?
        .id;
    let bitmap = store
        .composite(frame, &store.background())
        .context("composite frame")?;
    let png = bitmap.encode_png()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let project = read_project(&args.in_path)?;
    println!("name:      {}", project.name);
    println!("id:        {}", project.id);
    println!(
        "canvas:    {}x{}",
        project.canvas_size.width, project.canvas_size.height
    );
    println!("fps:       {}", project.fps);
    println!("frames:    {}", project.frames.len());
    println!("layers:    {}", project.layers.len());
    for layer in &project.layers {
        println!(
            "  - {} ({:?}, opacity {:.2}{}{})",
            layer.name,
            layer.blend_mode,
            layer.opacity,
            if layer.visible { "" } else { ", hidden" },
            if layer.locked { ", locked" } else { "" }
        );
    }
    println!("audio:     {}", project.audio_tracks.len());
    println!("duration:  {} ms", project.duration_ms());
    Ok(())
}
