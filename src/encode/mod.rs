//! Encoding sinks.
//!
//! Sinks consume composed frames in strictly increasing index order.

/// `ffmpeg`-based MP4 sink.
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
