use std::{
    cell::RefCell,
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        mpsc,
    },
};

use rayon::prelude::*;

use crate::{
    assets::fonts::FontFace,
    encode::sink::{AudioInputConfig, FrameSink, SinkConfig},
    foundation::{
        core::{Canvas, Fps, FrameIndex, FrameRange},
        error::{SingalongError, SingalongResult},
    },
    render::{
        compositor::{FrameCompositor, LyricStyle},
        frame::FrameRGBA,
    },
    stream::live::{CancelToken, LiveFrameGuard, LiveFrames},
    timeline::{
        index::{DEFAULT_BUCKET_WIDTH_SECS, TimelineIndex},
        model::{TextDirection, Timeline},
        resolve::WordResolver,
    },
};

/// Upper bound on frame bytes one parallel window may hold.
const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Compositor owned by a render worker, tagged with the run that built it.
    static WORKER: RefCell<Option<(u64, FrameCompositor)>> = const { RefCell::new(None) };
}

/// Options controlling how a [`FrameStream`] produces frames.
#[derive(Clone, Debug)]
pub struct StreamOpts {
    /// Output frame rate.
    pub fps: Fps,
    /// Video length in seconds. `None` uses the timeline's `duration`.
    pub duration_secs: Option<f64>,
    /// Width of a timeline index bucket in seconds.
    pub bucket_width_secs: f64,
    /// Lyric line appearance.
    pub style: LyricStyle,
    /// Render frames on a rayon pool and reorder them before the sink.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames rendered per parallel window; bounds how far workers run ahead of the sink.
    pub reorder_window: usize,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
    /// Audio file handed to the sink for muxing.
    pub audio: Option<PathBuf>,
}

impl Default for StreamOpts {
    fn default() -> Self {
        Self {
            fps: Fps { num: 24, den: 1 },
            duration_secs: None,
            bucket_width_secs: DEFAULT_BUCKET_WIDTH_SECS,
            style: LyricStyle::default(),
            parallel: false,
            threads: None,
            reorder_window: 16,
            channel_capacity: 4,
            audio: None,
        }
    }
}

impl StreamOpts {
    pub fn validate(&self) -> SingalongResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if let Some(d) = self.duration_secs
            && (!d.is_finite() || d < 0.0)
        {
            return Err(SingalongError::validation(
                "stream duration_secs must be finite and >= 0",
            ));
        }
        if !self.bucket_width_secs.is_finite() || self.bucket_width_secs <= 0.0 {
            return Err(SingalongError::validation(
                "stream bucket_width_secs must be finite and > 0",
            ));
        }
        if self.threads == Some(0) {
            return Err(SingalongError::validation(
                "stream 'threads' must be >= 1 when set",
            ));
        }
        if self.reorder_window == 0 || self.channel_capacity == 0 {
            return Err(SingalongError::validation(
                "stream reorder_window and channel_capacity must be >= 1",
            ));
        }
        self.style.validate()
    }
}

/// Lifecycle of a [`FrameStream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    /// Every frame reached the sink and the sink finalized.
    Done { frames: u64 },
    /// The stream stopped early; the sink holds `emitted` of `total` frames.
    Failed { emitted: u64, total: u64 },
}

/// Outcome of a completed [`FrameStream::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub frames_total: u64,
    pub frames_emitted: u64,
    /// Most composed frames alive at once during the run.
    pub peak_live_frames: usize,
    /// Compositors built for render workers; zero for sequential runs.
    pub worker_compositors: usize,
}

/// Drives a timeline over a background: one frame per index, pushed to a sink in order.
///
/// The timeline index is built once in [`FrameStream::new`]. Frames are never accumulated; in
/// sequential mode exactly one frame exists at a time, in parallel mode at most two
/// `reorder_window`s' worth.
pub struct FrameStream {
    timeline: Timeline,
    index: TimelineIndex,
    background: FrameRGBA,
    font: FontFace,
    direction: TextDirection,
    compositor: FrameCompositor,
    opts: StreamOpts,
    range: FrameRange,
    live: LiveFrames,
    state: StreamState,
}

impl FrameStream {
    /// Validate inputs and prepare a stream. Nothing is rendered yet.
    pub fn new(
        timeline: Timeline,
        background: FrameRGBA,
        font: FontFace,
        opts: StreamOpts,
    ) -> SingalongResult<Self> {
        opts.validate()?;
        timeline.validate()?;
        if background.width == 0 || background.height == 0 {
            return Err(SingalongError::validation(
                "background width/height must be non-zero",
            ));
        }
        let canvas = Canvas {
            width: background.width,
            height: background.height,
        };
        if background.data.len() != canvas.rgba_len() {
            return Err(SingalongError::validation(
                "background data size mismatch with width*height*4",
            ));
        }

        let duration = opts.duration_secs.unwrap_or(timeline.duration);
        // Every queried frame time is below `duration`.
        let index =
            TimelineIndex::build_until(&timeline.segments, opts.bucket_width_secs, duration)?;
        let compositor = worker_compositor(&font, &opts.style)?;
        let total_frames = opts.fps.frame_count_for(duration);
        let range = FrameRange::new(FrameIndex(0), FrameIndex(total_frames))?;
        let direction = timeline.direction();

        tracing::debug!(
            segments = timeline.segments.len(),
            buckets = index.bucket_count(),
            frames = range.len_frames(),
            ?direction,
            backend = compositor.backend_name(),
            "frame stream ready"
        );

        Ok(Self {
            timeline,
            index,
            background,
            font,
            direction,
            compositor,
            opts,
            range,
            live: LiveFrames::new(),
            state: StreamState::Idle,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of frames a full run emits, `ceil(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.range.len_frames()
    }

    /// Frames a full run emits, as `[0, total_frames)`.
    pub fn frame_range(&self) -> FrameRange {
        self.range
    }

    pub fn fps(&self) -> Fps {
        self.opts.fps
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// Handle on this stream's live-frame counter; clones observe the same counts.
    pub fn live_frames(&self) -> LiveFrames {
        self.live.clone()
    }

    /// Compose a single frame without touching the stream state.
    pub fn render_frame_at(&mut self, idx: FrameIndex) -> SingalongResult<FrameRGBA> {
        if !self.range.contains(idx) {
            return Err(SingalongError::validation(format!(
                "frame {} is outside the stream's {} frames",
                idx.0,
                self.range.len_frames()
            )));
        }
        let scene = Scene {
            resolver: WordResolver::new(&self.timeline, &self.index),
            background: &self.background,
            direction: self.direction,
            fps: self.opts.fps,
        };
        scene.compose(&mut self.compositor, idx)
    }

    /// Emit every frame to `sink` in strictly increasing index order.
    ///
    /// On a sink failure, a composition failure or cancellation, no further frames are
    /// emitted, `end` is still attempted on the sink and the error is
    /// [`SingalongError::Aborted`] carrying the number of frames the sink received.
    #[tracing::instrument(
        skip_all,
        fields(frames = self.range.len_frames(), parallel = self.opts.parallel)
    )]
    pub fn run(
        &mut self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> SingalongResult<StreamReport> {
        if self.state != StreamState::Idle {
            return Err(SingalongError::validation("frame stream has already run"));
        }
        let total = self.range.len_frames();
        let cfg = SinkConfig {
            width: self.background.width,
            height: self.background.height,
            fps: self.opts.fps,
            frames: total,
            audio: self
                .opts
                .audio
                .clone()
                .map(|path| AudioInputConfig { path }),
        };

        self.live.reset_peak();
        self.state = StreamState::Streaming;
        tracing::info!(total, "streaming frames");

        if let Err(e) = sink.begin(cfg) {
            return Err(self.fail(0, e));
        }

        let builds = AtomicUsize::new(0);
        let (emitted, res) = if self.opts.parallel {
            self.run_parallel(sink, cancel, &builds)
        } else {
            self.run_sequential(sink, cancel)
        };

        if let Err(cause) = res {
            if let Err(end_err) = sink.end() {
                tracing::warn!(error = %end_err, "sink failed to finalize partial output");
            }
            return Err(self.fail(emitted, cause));
        }
        if let Err(e) = sink.end() {
            return Err(self.fail(emitted, e));
        }

        self.state = StreamState::Done { frames: emitted };
        let report = StreamReport {
            frames_total: total,
            frames_emitted: emitted,
            peak_live_frames: self.live.peak(),
            worker_compositors: builds.into_inner(),
        };
        tracing::info!(
            frames = report.frames_emitted,
            peak_live = report.peak_live_frames,
            "stream finished"
        );
        Ok(report)
    }

    fn fail(&mut self, emitted: u64, cause: SingalongError) -> SingalongError {
        let total = self.range.len_frames();
        self.state = StreamState::Failed { emitted, total };
        tracing::warn!(emitted, total, error = %cause, "stream aborted; output is incomplete");
        SingalongError::Aborted {
            emitted,
            total,
            cause: Box::new(cause),
        }
    }

    fn run_sequential(
        &mut self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> (u64, SingalongResult<()>) {
        let scene = Scene {
            resolver: WordResolver::new(&self.timeline, &self.index),
            background: &self.background,
            direction: self.direction,
            fps: self.opts.fps,
        };
        for f in self.range.start.0..self.range.end.0 {
            if cancel.is_cancelled() {
                return (f, Err(SingalongError::Cancelled));
            }
            let _live = self.live.acquire();
            let res = scene
                .compose(&mut self.compositor, FrameIndex(f))
                .and_then(|frame| sink.push_frame(FrameIndex(f), &frame));
            if let Err(e) = res {
                return (f, Err(e));
            }
        }
        (self.range.len_frames(), Ok(()))
    }

    fn run_parallel(
        &self,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
        builds: &AtomicUsize,
    ) -> (u64, SingalongResult<()>) {
        let total = self.range.len_frames();
        if total == 0 {
            return (0, Ok(()));
        }
        let pool = match build_thread_pool(self.opts.threads) {
            Ok(p) => p,
            Err(e) => return (0, Err(e)),
        };
        let canvas = Canvas {
            width: self.background.width,
            height: self.background.height,
        };
        let window = window_len(self.opts.reorder_window, canvas).min(total);
        let cap = self.opts.channel_capacity.max(1);

        let ctx = WindowCtx {
            scene: Scene {
                resolver: WordResolver::new(&self.timeline, &self.index),
                background: &self.background,
                direction: self.direction,
                fps: self.opts.fps,
            },
            font: &self.font,
            style: &self.opts.style,
            pool: &pool,
            cancel,
            live: &self.live,
            run_id: NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed),
            builds,
        };

        // Encoder thread: enforce in-order delivery to the sink regardless of render completion
        // order.
        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let enc = scope.spawn(move || drain_in_order(sink, rx, total));

            let mut produced = Ok(());
            let mut window_start = self.range.start.0;
            while window_start < self.range.end.0 {
                if cancel.is_cancelled() {
                    produced = Err(SingalongError::Cancelled);
                    break;
                }
                let window_end = (window_start + window).min(self.range.end.0);
                tracing::trace!(window_start, window_end, "rendering window");
                let res = FrameRange::new(FrameIndex(window_start), FrameIndex(window_end))
                    .and_then(|w| render_window(&ctx, &tx, w));
                if let Err(e) = res {
                    produced = Err(e);
                    break;
                }
                window_start = window_end;
            }
            drop(tx);

            let (emitted, drained) = match enc.join() {
                Ok(r) => r,
                Err(_) => {
                    return (0, Err(SingalongError::evaluation("encoder thread panicked")));
                }
            };
            // A sink error is the root cause; the producer only saw a closed channel.
            let res = match (drained, produced) {
                (Err(e), _) | (Ok(()), Err(e)) => Err(e),
                (Ok(()), Ok(())) if emitted < total => Err(SingalongError::evaluation(
                    "render workers stopped before the last frame",
                )),
                (Ok(()), Ok(())) => Ok(()),
            };
            (emitted, res)
        })
    }
}

/// Everything needed to compose a frame, minus the compositor. Shared by all workers.
#[derive(Clone, Copy)]
struct Scene<'a> {
    resolver: WordResolver<'a>,
    background: &'a FrameRGBA,
    direction: TextDirection,
    fps: Fps,
}

impl Scene<'_> {
    fn compose(
        &self,
        compositor: &mut FrameCompositor,
        idx: FrameIndex,
    ) -> SingalongResult<FrameRGBA> {
        let t = self.fps.frame_time_secs(idx);
        let words = self.resolver.resolve(t);
        compositor.render(self.background, &words, self.direction)
    }
}

fn worker_compositor(font: &FontFace, style: &LyricStyle) -> SingalongResult<FrameCompositor> {
    FrameCompositor::new(style.clone(), font.backend(style.font_size_px)?)
}

/// Frames per parallel window: `reorder_window`, shrunk so a window stays within
/// [`MAX_REORDER_BUFFER_BYTES`].
fn window_len(reorder_window: usize, canvas: Canvas) -> u64 {
    let bytes_per_frame = (canvas.rgba_len() as u64).max(1);
    let max_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
    (reorder_window as u64).clamp(1, max_by_mem)
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
    _live: LiveFrameGuard,
}

#[derive(Clone, Copy)]
struct WindowCtx<'a> {
    scene: Scene<'a>,
    font: &'a FontFace,
    style: &'a LyricStyle,
    pool: &'a rayon::ThreadPool,
    cancel: &'a CancelToken,
    live: &'a LiveFrames,
    run_id: u64,
    builds: &'a AtomicUsize,
}

impl WindowCtx<'_> {
    /// Compose `idx` with the calling worker's compositor, building it on first use in this run.
    fn compose_on_worker(&self, idx: FrameIndex) -> SingalongResult<FrameRGBA> {
        WORKER.with_borrow_mut(|slot| -> SingalongResult<FrameRGBA> {
            if !matches!(slot.as_ref(), Some((id, _)) if *id == self.run_id) {
                let compositor = worker_compositor(self.font, self.style).map_err(|e| {
                    SingalongError::evaluation(format!("render worker setup failed: {e}"))
                })?;
                self.builds.fetch_add(1, Ordering::Relaxed);
                *slot = Some((self.run_id, compositor));
            }
            match slot.as_mut() {
                Some((_, compositor)) => self.scene.compose(compositor, idx),
                None => Err(SingalongError::evaluation("render worker has no compositor")),
            }
        })
    }
}

fn render_window(
    ctx: &WindowCtx<'_>,
    tx: &mpsc::SyncSender<FrameMsg>,
    window: FrameRange,
) -> SingalongResult<()> {
    ctx.pool.install(|| {
        (window.start.0..window.end.0).into_par_iter().try_for_each_with(
            tx.clone(),
            |tx, f| -> SingalongResult<()> {
                if ctx.cancel.is_cancelled() {
                    return Err(SingalongError::Cancelled);
                }
                let live = ctx.live.acquire();
                let frame = ctx.compose_on_worker(FrameIndex(f))?;
                tx.send(FrameMsg {
                    idx: FrameIndex(f),
                    frame,
                    _live: live,
                })
                .map_err(|_| SingalongError::evaluation("encoder thread is not accepting frames"))
            },
        )
    })
}

/// Push frames to `sink` in index order until `total` frames or the channel closes.
///
/// Returns the number of frames the sink accepted. A closed channel is not an error here; the
/// producer reports why it stopped.
fn drain_in_order(
    sink: &mut dyn FrameSink,
    rx: mpsc::Receiver<FrameMsg>,
    total: u64,
) -> (u64, SingalongResult<()>) {
    let mut next = 0u64;
    let mut pending = HashMap::<u64, FrameMsg>::new();
    while next < total {
        if let Some(msg) = pending.remove(&next) {
            if let Err(e) = sink.push_frame(msg.idx, &msg.frame) {
                return (next, Err(e));
            }
            next += 1;
            continue;
        }
        match rx.recv() {
            Ok(msg) => {
                pending.insert(msg.idx.0, msg);
            }
            Err(_) => return (next, Ok(())),
        }
    }
    (next, Ok(()))
}

fn build_thread_pool(threads: Option<usize>) -> SingalongResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SingalongError::validation(
            "stream 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SingalongError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encode::sink::InMemorySink,
        render::builtin::BlockTextBackend,
        timeline::{
            model::{Segment, Word},
            resolve::ResolvedWord,
        },
    };

    fn word(text: &str, start: f64, end: f64) -> Word {
        Word {
            text: text.to_string(),
            start,
            end,
        }
    }

    fn timeline() -> Timeline {
        Timeline {
            duration: 5.0,
            language: "en".to_string(),
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 2.0,
                    words: vec![word("hello", 0.0, 1.0), word("world", 1.0, 2.0)],
                },
                Segment {
                    start: 2.5,
                    end: 4.0,
                    words: vec![word("again", 2.5, 4.0)],
                },
            ],
        }
    }

    fn style() -> LyricStyle {
        LyricStyle {
            font_size_px: 12.0,
            bottom_offset_px: 30.0,
            ..LyricStyle::default()
        }
    }

    fn background() -> FrameRGBA {
        FrameRGBA::filled(160, 90, [20, 40, 80, 255])
    }

    fn stream(opts: StreamOpts) -> FrameStream {
        FrameStream::new(timeline(), background(), FontFace::Builtin, opts).unwrap()
    }

    fn reference(words: &[ResolvedWord]) -> FrameRGBA {
        let backend = BlockTextBackend::new(12.0).unwrap();
        let mut c = FrameCompositor::new(style(), Box::new(backend)).unwrap();
        c.render(&background(), words, TextDirection::Ltr).unwrap()
    }

    #[test]
    fn five_seconds_at_24fps_emits_120_ordered_frames() {
        let mut s = stream(StreamOpts {
            style: style(),
            ..StreamOpts::default()
        });
        let mut sink = InMemorySink::new();
        let report = s.run(&mut sink, &CancelToken::new()).unwrap();

        assert_eq!(report.frames_total, 120);
        assert_eq!(report.frames_emitted, 120);
        assert_eq!(report.peak_live_frames, 1);
        assert_eq!(s.state(), StreamState::Done { frames: 120 });
        assert!(sink.ended());
        assert_eq!(sink.frames().len(), 120);
        for (i, (idx, _)) in sink.frames().iter().enumerate() {
            assert_eq!(idx.0, i as u64);
        }

        // t = 0.5, 1.5, 3.0 and a gap at ~2.21.
        let at = |f: usize| &sink.frames()[f].1;
        assert_eq!(
            at(12),
            &reference(&[
                ResolvedWord::new("hello", true),
                ResolvedWord::new("world", false)
            ])
        );
        assert_eq!(
            at(36),
            &reference(&[
                ResolvedWord::new("hello", false),
                ResolvedWord::new("world", true)
            ])
        );
        assert_eq!(at(72), &reference(&[ResolvedWord::new("again", true)]));
        assert_eq!(at(53), &background());
    }

    #[test]
    fn run_twice_is_rejected() {
        let mut s = stream(StreamOpts {
            duration_secs: Some(0.5),
            ..StreamOpts::default()
        });
        s.run(&mut InMemorySink::new(), &CancelToken::new()).unwrap();
        assert!(s.run(&mut InMemorySink::new(), &CancelToken::new()).is_err());
    }

    #[test]
    fn render_frame_at_matches_stream_and_checks_bounds() {
        let mut s = stream(StreamOpts {
            style: style(),
            ..StreamOpts::default()
        });
        let f = s.render_frame_at(FrameIndex(72)).unwrap();
        assert_eq!(f, reference(&[ResolvedWord::new("again", true)]));
        assert!(s.render_frame_at(FrameIndex(120)).is_err());
        assert_eq!(s.state(), StreamState::Idle);
    }

    #[test]
    fn duration_override_and_zero_frames() {
        let mut s = stream(StreamOpts {
            duration_secs: Some(0.0),
            ..StreamOpts::default()
        });
        assert_eq!(s.total_frames(), 0);
        let mut sink = InMemorySink::new();
        let report = s.run(&mut sink, &CancelToken::new()).unwrap();
        assert_eq!(report.frames_emitted, 0);
        assert!(sink.ended());
    }

    #[test]
    fn invalid_opts_fail_before_any_work() {
        let bad = StreamOpts {
            reorder_window: 0,
            ..StreamOpts::default()
        };
        assert!(FrameStream::new(timeline(), background(), FontFace::Builtin, bad).is_err());

        let bad = StreamOpts {
            duration_secs: Some(f64::NAN),
            ..StreamOpts::default()
        };
        assert!(FrameStream::new(timeline(), background(), FontFace::Builtin, bad).is_err());

        let empty_bg = FrameRGBA::filled(0, 0, [0, 0, 0, 255]);
        assert!(
            FrameStream::new(timeline(), empty_bg, FontFace::Builtin, StreamOpts::default())
                .is_err()
        );
    }

    #[test]
    fn runaway_segment_end_is_indexed_up_to_the_video_only() {
        let mut tl = timeline();
        tl.segments[1].end = 20_000_000.0;
        tl.segments[1].words[0].end = 20_000_000.0;
        let mut s = FrameStream::new(
            tl,
            background(),
            FontFace::Builtin,
            StreamOpts {
                style: style(),
                ..StreamOpts::default()
            },
        )
        .unwrap();
        assert_eq!(s.index.bucket_count(), 6);
        assert_eq!(s.frame_range(), FrameRange::new(FrameIndex(0), FrameIndex(120)).unwrap());
        let last = s.render_frame_at(FrameIndex(119)).unwrap();
        assert_eq!(last, reference(&[ResolvedWord::new("again", true)]));
    }

    #[test]
    fn tiny_bucket_width_is_rejected() {
        let opts = StreamOpts {
            bucket_width_secs: 1e-9,
            ..StreamOpts::default()
        };
        let err = FrameStream::new(timeline(), background(), FontFace::Builtin, opts).err().unwrap();
        assert!(matches!(err, SingalongError::Validation(_)));
    }

    #[test]
    fn window_is_capped_by_frame_bytes() {
        let small = Canvas {
            width: 160,
            height: 90,
        };
        assert_eq!(window_len(16, small), 16);
        assert_eq!(window_len(0, small), 1);

        // 64 MiB per frame leaves room for two.
        let huge = Canvas {
            width: 4096,
            height: 4096,
        };
        assert_eq!(window_len(16, huge), 2);
        let enormous = Canvas {
            width: 16384,
            height: 16384,
        };
        assert_eq!(window_len(16, enormous), 1);
    }

    #[test]
    fn parallel_run_builds_one_compositor_per_worker() {
        let mut s = stream(StreamOpts {
            style: style(),
            parallel: true,
            threads: Some(2),
            reorder_window: 1,
            ..StreamOpts::default()
        });
        let mut sink = InMemorySink::new();
        let report = s.run(&mut sink, &CancelToken::new()).unwrap();
        assert_eq!(report.frames_emitted, 120);
        // 120 single-frame windows, yet no worker rebuilds its compositor.
        assert!(report.worker_compositors >= 1);
        assert!(report.worker_compositors <= 2);
        assert_eq!(
            &sink.frames()[72].1,
            &reference(&[ResolvedWord::new("again", true)])
        );
    }

    #[test]
    fn sequential_run_builds_no_worker_compositors() {
        let mut s = stream(StreamOpts {
            duration_secs: Some(0.5),
            ..StreamOpts::default()
        });
        let report = s.run(&mut InMemorySink::new(), &CancelToken::new()).unwrap();
        assert_eq!(report.worker_compositors, 0);
    }

    #[test]
    fn drain_reorders_out_of_order_messages() {
        let live = LiveFrames::new();
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(8);
        for i in [2u64, 0, 1] {
            tx.send(FrameMsg {
                idx: FrameIndex(i),
                frame: FrameRGBA::filled(2, 2, [i as u8, 0, 0, 255]),
                _live: live.acquire(),
            })
            .unwrap();
        }
        drop(tx);

        let mut sink = InMemorySink::new();
        let (emitted, res) = drain_in_order(&mut sink, rx, 5);
        res.unwrap();
        assert_eq!(emitted, 3);
        let firsts: Vec<u8> = sink.frames().iter().map(|(_, f)| f.data[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
        assert_eq!(live.live(), 0);
    }
}
