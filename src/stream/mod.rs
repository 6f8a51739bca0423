//! Frame streaming: drives the timeline frame by frame and hands each frame to a sink.

pub mod frame_stream;
pub mod live;
