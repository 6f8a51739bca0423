use std::path::PathBuf;

use crate::{
    foundation::{
        core::{Fps, FrameIndex},
        error::{SingalongError, SingalongResult},
    },
    render::frame::FrameRGBA,
};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Number of frames the stream will push.
    pub frames: u64,
    /// Optional audio track to mux alongside the video.
    pub audio: Option<AudioInputConfig>,
}

impl SinkConfig {
    /// Video duration in seconds implied by `frames` and `fps`.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frame_time_secs(FrameIndex(self.frames))
    }
}

/// An audio file to mux; any format the encoder can decode.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to the audio file.
    pub path: PathBuf,
}

/// Push interface to an encoder.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, once
/// per frame, with no gaps. The frame is only borrowed for the duration of the call.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SingalongResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SingalongResult<()>;
    /// Called once after the last frame, or after an aborted stream to finalize what exists.
    fn end(&mut self) -> SingalongResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SingalongResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SingalongResult<()> {
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(SingalongError::sink(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> SingalongResult<()> {
        self.ended = true;
        Ok(())
    }
}
