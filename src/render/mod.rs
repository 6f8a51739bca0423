//! Frame composition: lyric layout, outline drawing and text backends.

pub mod backend;
pub mod builtin;
pub mod composite;
pub mod compositor;
pub mod cpu;
pub mod frame;
