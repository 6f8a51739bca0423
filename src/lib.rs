//! Singalong renders karaoke-style lyric videos.
//!
//! A word-timed lyric [`Timeline`] is indexed once, then a [`FrameStream`] walks the output
//! frames, resolves the visible and highlighted words at each instant, draws them as one
//! outlined line over a static background and pushes each frame to a [`FrameSink`]:
//!
//! - Load a [`Timeline`] and a background ([`load_background`])
//! - Resolve a font through a [`FontCache`]
//! - Create a [`FrameStream`] and [`FrameStream::run`] it into a sink such as [`FfmpegSink`]
#![forbid(unsafe_code)]

mod foundation;

/// Background images and fonts.
pub mod assets;
/// Encoding sinks.
pub mod encode;
/// Frame composition.
pub mod render;
/// Streaming driver.
pub mod stream;
/// Lyric timeline model and lookup.
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8};
pub use crate::foundation::error::{SingalongError, SingalongResult};

pub use crate::assets::background::{decode_background, load_background, solid_background};
pub use crate::assets::fonts::{FontCache, FontFace};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::backend::{TextBackend, TextDraw};
pub use crate::render::builtin::BlockTextBackend;
pub use crate::render::compositor::{FrameCompositor, LinePlan, LyricStyle, PlacedWord};
pub use crate::render::cpu::VelloTextBackend;
pub use crate::render::frame::FrameRGBA;
pub use crate::stream::frame_stream::{FrameStream, StreamOpts, StreamReport, StreamState};
pub use crate::stream::live::{CancelToken, LiveFrames};
pub use crate::timeline::index::{DEFAULT_BUCKET_WIDTH_SECS, MAX_INDEX_ENTRIES, TimelineIndex};
pub use crate::timeline::model::{Segment, TextDirection, Timeline, TimelineWarning, Word};
pub use crate::timeline::resolve::{ResolvedWord, WordResolver, resolve_linear};
