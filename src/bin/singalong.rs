use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use singalong::{
    CancelToken, Canvas, FfmpegSink, FfmpegSinkOpts, FontCache, Fps, FrameIndex, FrameRGBA,
    FrameStream, LyricStyle, Rgba8, StreamOpts, Timeline,
};

#[derive(Parser, Debug)]
#[command(name = "singalong", version, about = "Render word-timed lyric videos")]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Lyric timeline JSON.
    #[arg(long)]
    lyrics: PathBuf,

    /// Background image. Without it the frame is solid black.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Output width; defaults to the background's width (rounded down to even) or 1280.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height; defaults to the background's height (rounded down to even) or 720.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Frames per second.
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Override the video length in seconds (defaults to the timeline's duration).
    #[arg(long)]
    duration: Option<f64>,

    /// TrueType/OpenType font file; falls back to system fonts, then a built-in face.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Lyric style JSON (font size, colours, outline, spacing).
    #[arg(long)]
    style: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Time in seconds of the frame to render.
    #[arg(long, conflicts_with = "frame")]
    time: Option<f64>,

    /// Frame index (0-based).
    #[arg(long)]
    frame: Option<u64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Audio file muxed into the output; a missing file renders a silent video.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Fail instead of replacing an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Frames rendered ahead of the encoder per window (parallel mode only).
    #[arg(long, default_value_t = 16)]
    reorder_window: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut stream = open_stream(&args.input, StreamOpts::default())?;

    let idx = match (args.time, args.frame) {
        (Some(t), _) => {
            if !t.is_finite() || t < 0.0 {
                anyhow::bail!("--time must be a finite number of seconds >= 0");
            }
            FrameIndex((t * stream.fps().as_f64()).floor() as u64)
        }
        (None, Some(f)) => FrameIndex(f),
        (None, None) => FrameIndex(0),
    };
    let frame = stream.render_frame_at(idx)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} (frame {})", args.out.display(), idx.0);
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = StreamOpts {
        parallel: args.parallel,
        threads: args.threads,
        reorder_window: args.reorder_window,
        audio: args.audio.clone(),
        ..StreamOpts::default()
    };
    let mut stream = open_stream(&args.input, opts)?;

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        overwrite: !args.no_overwrite,
        ..FfmpegSinkOpts::new(&args.out)
    });
    let report = stream.run(&mut sink, &CancelToken::new())?;

    eprintln!(
        "wrote {} ({} frames)",
        args.out.display(),
        report.frames_emitted
    );
    Ok(())
}

fn open_stream(input: &InputArgs, base: StreamOpts) -> anyhow::Result<FrameStream> {
    let timeline = Timeline::load(&input.lyrics)?;
    let style = match input.style.as_deref() {
        Some(path) => LyricStyle::load(path)?,
        None => LyricStyle::default(),
    };
    let canvas = match (input.width, input.height) {
        (Some(width), Some(height)) => Some(Canvas { width, height }),
        _ => None,
    };
    let background = background(input.background.as_deref(), canvas)?;
    let font = FontCache::new().resolve(input.font.as_deref());
    tracing::info!(font = %font.describe(), "resolved font");

    let opts = StreamOpts {
        fps: Fps::new(input.fps, 1)?,
        duration_secs: input.duration,
        style,
        ..base
    };
    Ok(FrameStream::new(timeline, background, font, opts)?)
}

fn background(path: Option<&Path>, canvas: Option<Canvas>) -> anyhow::Result<FrameRGBA> {
    match path {
        Some(path) => Ok(singalong::load_background(path, canvas)?),
        None => {
            let canvas = canvas.unwrap_or(Canvas {
                width: 1280,
                height: 720,
            });
            Ok(singalong::solid_background(canvas, Rgba8::rgb(0, 0, 0))?)
        }
    }
}
