//! Background images and font resolution.

pub mod background;
pub mod fonts;
