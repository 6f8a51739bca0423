//! Lyric timeline model, time-bucket index and per-instant word resolution.

pub mod index;
pub mod model;
pub mod resolve;
