use crate::{
    foundation::{core::Rgba8, error::SingalongResult},
    render::frame::FrameRGBA,
};

/// One positioned text draw. `(x, y)` is the top-left of the text's line box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextDraw {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: Rgba8,
}

/// Text measurement and rasterisation for one font at one size.
///
/// Implementations may keep per-text caches; they only ever write into the frame passed in.
/// Each render worker owns its own backend.
pub trait TextBackend {
    /// Advance width of `text` in pixels.
    fn measure_width(&mut self, text: &str) -> SingalongResult<f32>;

    /// Height of the line box in pixels.
    fn line_height(&mut self) -> f32;

    /// Draw a single run of text into `frame`.
    fn draw_text(&mut self, frame: &mut FrameRGBA, draw: &TextDraw) -> SingalongResult<()>;

    /// Draw `draws` in order. Backends that rasterise whole layers override this.
    fn draw_batch(&mut self, frame: &mut FrameRGBA, draws: &[TextDraw]) -> SingalongResult<()> {
        for d in draws {
            self.draw_text(frame, d)?;
        }
        Ok(())
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
