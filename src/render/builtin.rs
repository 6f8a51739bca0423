use std::collections::HashMap;

use crate::{
    foundation::error::{SingalongError, SingalongResult},
    render::{
        backend::{TextBackend, TextDraw},
        composite::over,
        frame::FrameRGBA,
    },
};

/// Last-resort face: every non-space character is a solid box.
///
/// Needs no font file and is fully deterministic, so it doubles as the face used by
/// pixel-level tests.
pub struct BlockTextBackend {
    size_px: f32,
    widths: HashMap<String, f32>,
}

impl BlockTextBackend {
    pub fn new(size_px: f32) -> SingalongResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(SingalongError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        Ok(Self {
            size_px,
            widths: HashMap::new(),
        })
    }

    /// Horizontal advance per character.
    pub fn advance(&self) -> f32 {
        self.size_px * 0.6
    }

    fn fill_box(frame: &mut FrameRGBA, x0: f32, y0: f32, x1: f32, y1: f32, premul: [u8; 4]) {
        let clamp_x = |v: f32| v.round().clamp(0.0, frame.width as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, frame.height as f32) as u32;
        let (x0, x1) = (clamp_x(x0), clamp_x(x1));
        let (y0, y1) = (clamp_y(y0), clamp_y(y1));
        for y in y0..y1 {
            for x in x0..x1 {
                let o = frame.offset(x, y);
                let d = [
                    frame.data[o],
                    frame.data[o + 1],
                    frame.data[o + 2],
                    frame.data[o + 3],
                ];
                frame.data[o..o + 4].copy_from_slice(&over(d, premul, 1.0));
            }
        }
    }
}

impl TextBackend for BlockTextBackend {
    fn measure_width(&mut self, text: &str) -> SingalongResult<f32> {
        if let Some(w) = self.widths.get(text) {
            return Ok(*w);
        }
        let w = text.chars().count() as f32 * self.advance();
        self.widths.insert(text.to_string(), w);
        Ok(w)
    }

    fn line_height(&mut self) -> f32 {
        self.size_px
    }

    fn draw_text(&mut self, frame: &mut FrameRGBA, draw: &TextDraw) -> SingalongResult<()> {
        let premul = draw.color.to_premul();
        let advance = self.advance();
        let glyph_w = self.size_px * 0.5;
        let top = draw.y + self.size_px * 0.15;
        let bottom = draw.y + self.size_px * 0.85;
        for (i, ch) in draw.text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let left = draw.x + i as f32 * advance;
            Self::fill_box(frame, left, top, left + glyph_w, bottom, premul);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "builtin-block"
    }
}
