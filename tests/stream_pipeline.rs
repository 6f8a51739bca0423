use singalong::{
    BlockTextBackend, CancelToken, FontFace, FrameCompositor, FrameIndex, FrameRGBA, FrameSink,
    FrameStream, InMemorySink, LiveFrames, LyricStyle, ResolvedWord, SingalongError,
    SingalongResult, SinkConfig, StreamOpts, StreamState, TextDirection, Timeline, TimelineIndex,
    WordResolver,
};

const LYRICS: &str = r#"{
    "duration": 5.0,
    "language": "en",
    "segments": [
        { "start": 0.0, "end": 2.0, "words": [
            { "word": "hello", "start": 0.0, "end": 1.0 },
            { "word": "world", "start": 1.0, "end": 2.0 }
        ] },
        { "start": 2.5, "end": 4.0, "words": [
            { "word": "again", "start": 2.5, "end": 4.0 }
        ] }
    ]
}"#;

fn background() -> FrameRGBA {
    let (w, h) = (128u32, 72u32);
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 2) as u8, (y * 3) as u8, 90, 255]);
        }
    }
    FrameRGBA {
        width: w,
        height: h,
        data,
        premultiplied: true,
    }
}

fn opts(parallel: bool) -> StreamOpts {
    StreamOpts {
        style: LyricStyle {
            font_size_px: 10.0,
            bottom_offset_px: 20.0,
            ..LyricStyle::default()
        },
        parallel,
        threads: Some(3),
        reorder_window: 8,
        channel_capacity: 2,
        ..StreamOpts::default()
    }
}

fn stream(lyrics: &str, parallel: bool) -> FrameStream {
    let tl = Timeline::from_json_str(lyrics).unwrap();
    FrameStream::new(tl, background(), FontFace::Builtin, opts(parallel)).unwrap()
}

/// Records the highest live-frame count seen at any push and keeps only a digest.
struct CountingSink {
    live: LiveFrames,
    max_live_at_push: usize,
    pushed: u64,
    digests: Vec<u64>,
}

impl CountingSink {
    fn new(live: LiveFrames) -> Self {
        Self {
            live,
            max_live_at_push: 0,
            pushed: 0,
            digests: Vec::new(),
        }
    }
}

fn digest(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |h, &b| {
        (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

impl FrameSink for CountingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> SingalongResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SingalongResult<()> {
        assert_eq!(idx.0, self.pushed);
        self.max_live_at_push = self.max_live_at_push.max(self.live.live());
        self.pushed += 1;
        self.digests.push(digest(&frame.data));
        Ok(())
    }

    fn end(&mut self) -> SingalongResult<()> {
        Ok(())
    }
}

/// Fails at a given frame and remembers whether `end` ran.
struct FailingSink {
    fail_at: u64,
    accepted: u64,
    ended: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> SingalongResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> SingalongResult<()> {
        if idx.0 == self.fail_at {
            return Err(SingalongError::sink("disk full"));
        }
        self.accepted += 1;
        Ok(())
    }

    fn end(&mut self) -> SingalongResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Cancels the run once a given frame has been accepted.
struct CancellingSink {
    token: CancelToken,
    cancel_after: u64,
    accepted: u64,
}

impl FrameSink for CancellingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> SingalongResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> SingalongResult<()> {
        self.accepted += 1;
        if idx.0 == self.cancel_after {
            self.token.cancel();
        }
        Ok(())
    }

    fn end(&mut self) -> SingalongResult<()> {
        Ok(())
    }
}

#[test]
fn parallel_output_matches_sequential() {
    let mut seq = InMemorySink::new();
    stream(LYRICS, false)
        .run(&mut seq, &CancelToken::new())
        .unwrap();
    let mut par = InMemorySink::new();
    let report = stream(LYRICS, true)
        .run(&mut par, &CancelToken::new())
        .unwrap();

    assert_eq!(report.frames_emitted, 120);
    assert_eq!(seq.frames().len(), par.frames().len());
    for ((ia, a), (ib, b)) in seq.frames().iter().zip(par.frames()) {
        assert_eq!(ia, ib);
        assert_eq!(a, b, "frame {}", ia.0);
    }
}

#[test]
fn sequential_stream_holds_one_frame_at_a_time() {
    let mut s = stream(LYRICS, false);
    let mut sink = CountingSink::new(s.live_frames());
    let report = s.run(&mut sink, &CancelToken::new()).unwrap();
    assert_eq!(sink.pushed, 120);
    assert_eq!(sink.max_live_at_push, 1);
    assert_eq!(report.peak_live_frames, 1);
    assert_eq!(s.live_frames().live(), 0);
}

#[test]
fn parallel_stream_memory_is_bounded_by_window() {
    let long = LYRICS.replace("\"duration\": 5.0", "\"duration\": 30.0");
    let mut s = stream(&long, true);
    let mut sink = CountingSink::new(s.live_frames());
    let report = s.run(&mut sink, &CancelToken::new()).unwrap();
    assert_eq!(report.frames_emitted, 720);
    assert!(report.peak_live_frames <= 2 * 8, "peak {}", report.peak_live_frames);
    assert!(sink.max_live_at_push <= 2 * 8);
    assert_eq!(s.live_frames().live(), 0);
}

#[test]
fn sink_failure_aborts_with_partial_count() {
    for parallel in [false, true] {
        let mut s = stream(LYRICS, parallel);
        let mut sink = FailingSink {
            fail_at: 10,
            accepted: 0,
            ended: false,
        };
        let err = s.run(&mut sink, &CancelToken::new()).unwrap_err();
        match &err {
            SingalongError::Aborted {
                emitted,
                total,
                cause,
            } => {
                assert_eq!((*emitted, *total), (10, 120));
                assert!(matches!(**cause, SingalongError::Sink(_)), "{cause}");
            }
            other => panic!("expected abort, got {other}"),
        }
        assert_eq!(err.partial_frames(), Some(10));
        assert_eq!(sink.accepted, 10);
        assert!(sink.ended, "partial output must still be finalized");
        assert_eq!(
            s.state(),
            StreamState::Failed {
                emitted: 10,
                total: 120
            }
        );
    }
}

#[test]
fn cancellation_stops_issuing_frames() {
    for parallel in [false, true] {
        let token = CancelToken::new();
        let mut s = stream(LYRICS, parallel);
        let mut sink = CancellingSink {
            token: token.clone(),
            cancel_after: 5,
            accepted: 0,
        };
        let err = s.run(&mut sink, &token).unwrap_err();
        let SingalongError::Aborted { emitted, cause, .. } = err else {
            panic!("expected abort");
        };
        assert!(matches!(*cause, SingalongError::Cancelled));
        assert_eq!(emitted, sink.accepted);
        assert!(emitted < 120);
        if !parallel {
            assert_eq!(emitted, 6);
        }
    }
}

#[test]
fn empty_timeline_frames_equal_background() {
    let mut sink = InMemorySink::new();
    stream(r#"{ "duration": 1.0, "segments": [] }"#, false)
        .run(&mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(sink.frames().len(), 24);
    let bg = background();
    assert!(sink.frames().iter().all(|(_, f)| *f == bg));
}

#[test]
fn sink_config_describes_the_stream() {
    let mut sink = InMemorySink::new();
    let mut s = stream(LYRICS, false);
    s.run(&mut sink, &CancelToken::new()).unwrap();
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (128, 72));
    assert_eq!(cfg.frames, 120);
    assert_eq!(cfg.fps.num, 24);
    assert!(cfg.audio.is_none());
}

#[test]
fn hello_world_end_to_end() {
    let json = r#"{ "duration": 5.0, "language": "en", "segments": [
        { "start": 0, "end": 2.5, "words": [
            { "word": "Hello", "start": 0, "end": 1 },
            { "word": "world", "start": 1, "end": 2.5 } ] } ] }"#;
    let tl = Timeline::from_json_str(json).unwrap();

    let index = TimelineIndex::build(&tl.segments, 1.0).unwrap();
    let resolver = WordResolver::new(&tl, &index);
    let hello_on = vec![
        ResolvedWord::new("Hello", true),
        ResolvedWord::new("world", false),
    ];
    let world_on = vec![
        ResolvedWord::new("Hello", false),
        ResolvedWord::new("world", true),
    ];
    assert_eq!(resolver.resolve(0.5), hello_on);
    assert_eq!(resolver.resolve(1.5), world_on);
    assert!(resolver.resolve(3.0).is_empty());

    let mut sink = InMemorySink::new();
    stream(json, false)
        .run(&mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(sink.frames().len(), 120);

    let style = opts(false).style;
    let backend = BlockTextBackend::new(style.font_size_px).unwrap();
    let mut compositor = FrameCompositor::new(style, Box::new(backend)).unwrap();
    let bg = background();
    let mut expect =
        |words: &[ResolvedWord]| compositor.render(&bg, words, TextDirection::Ltr).unwrap();

    assert_eq!(sink.frames()[12].1, expect(&hello_on));
    assert_eq!(sink.frames()[36].1, expect(&world_on));
    assert_eq!(sink.frames()[72].1, bg);
}
