use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::{
        core::Rgba8,
        error::{SingalongError, SingalongResult},
    },
    render::{
        backend::{TextBackend, TextDraw},
        frame::FrameRGBA,
    },
    timeline::{model::TextDirection, resolve::ResolvedWord},
};

/// Visual parameters of the lyric line. Deserialisable from a JSON style file; omitted keys
/// keep their defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LyricStyle {
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Colour of the word currently being sung.
    pub highlight: Rgba8,
    /// Colour of visible words that are not being sung.
    pub normal: Rgba8,
    /// Colour of the legibility outline.
    pub outline: Rgba8,
    /// Outline ring radius in pixels; 1 draws 8 offsets, 2 draws 24.
    pub outline_radius: u32,
    /// Gap between adjacent words in pixels.
    pub word_spacing_px: f32,
    /// Smallest allowed left edge of the line.
    pub min_margin_px: f32,
    /// Distance from the frame bottom to the vertical centre of the line.
    pub bottom_offset_px: f32,
}

impl Default for LyricStyle {
    fn default() -> Self {
        Self {
            font_size_px: 45.0,
            highlight: Rgba8::rgb(255, 255, 0),
            normal: Rgba8::rgb(255, 255, 255),
            outline: Rgba8::rgb(0, 0, 0),
            outline_radius: 2,
            word_spacing_px: 12.0,
            min_margin_px: 20.0,
            bottom_offset_px: 150.0,
        }
    }
}

impl LyricStyle {
    pub fn validate(&self) -> SingalongResult<()> {
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(SingalongError::validation(
                "style font_size_px must be finite and > 0",
            ));
        }
        for (name, v) in [
            ("word_spacing_px", self.word_spacing_px),
            ("min_margin_px", self.min_margin_px),
            ("bottom_offset_px", self.bottom_offset_px),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(SingalongError::validation(format!(
                    "style {name} must be finite and >= 0"
                )));
            }
        }
        if self.outline_radius > 8 {
            return Err(SingalongError::validation(
                "style outline_radius must be <= 8",
            ));
        }
        Ok(())
    }

    /// Read and validate a style file.
    pub fn load(path: &Path) -> SingalongResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read style '{}'", path.display()))?;
        let style: LyricStyle = serde_json::from_str(&s).context("parse style JSON")?;
        style.validate()?;
        Ok(style)
    }

    /// Offsets of the outline ring, excluding the centre.
    pub fn outline_offsets(&self) -> Vec<(f32, f32)> {
        let r = self.outline_radius as i32;
        let mut out = Vec::with_capacity(((2 * r + 1) * (2 * r + 1) - 1).max(0) as usize);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx != 0 || dy != 0 {
                    out.push((dx as f32, dy as f32));
                }
            }
        }
        out
    }
}

/// Where one word landed on the line.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub x: f32,
    pub width: f32,
    pub highlighted: bool,
}

/// Geometry and draw list for one frame's lyric line.
#[derive(Clone, Debug, PartialEq)]
pub struct LinePlan {
    pub line_width: f32,
    pub top: f32,
    /// Words in resolver order.
    pub words: Vec<PlacedWord>,
    /// All outline draws, then all foreground draws.
    pub draws: Vec<TextDraw>,
}

/// Lays out resolved words as one centred line and draws them, outlined, over a background.
pub struct FrameCompositor {
    style: LyricStyle,
    outline: Vec<(f32, f32)>,
    backend: Box<dyn TextBackend>,
}

impl FrameCompositor {
    pub fn new(style: LyricStyle, backend: Box<dyn TextBackend>) -> SingalongResult<Self> {
        style.validate()?;
        let outline = style.outline_offsets();
        Ok(Self {
            style,
            outline,
            backend,
        })
    }

    pub fn style(&self) -> &LyricStyle {
        &self.style
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Compute positions for `words` on a `frame_width` x `frame_height` frame.
    ///
    /// LTR places the first word leftmost and advances right; RTL places the first word
    /// rightmost and advances left. Word order is never changed.
    pub fn layout(
        &mut self,
        words: &[ResolvedWord],
        direction: TextDirection,
        frame_width: u32,
        frame_height: u32,
    ) -> SingalongResult<LinePlan> {
        let spacing = self.style.word_spacing_px;
        let mut widths = Vec::with_capacity(words.len());
        for w in words {
            widths.push(self.backend.measure_width(&w.text)?);
        }
        let gaps = words.len().saturating_sub(1) as f32;
        let line_width = widths.iter().sum::<f32>() + spacing * gaps;

        let left = ((frame_width as f32 - line_width) / 2.0).max(self.style.min_margin_px);
        let line_height = self.backend.line_height();
        let top = frame_height as f32 - self.style.bottom_offset_px - line_height / 2.0;

        let mut placed = Vec::with_capacity(words.len());
        match direction {
            TextDirection::Ltr => {
                let mut x = left;
                for (w, &width) in words.iter().zip(&widths) {
                    placed.push(place(w, x, width));
                    x += width + spacing;
                }
            }
            TextDirection::Rtl => {
                let mut right = left + line_width;
                for (w, &width) in words.iter().zip(&widths) {
                    placed.push(place(w, right - width, width));
                    right -= width + spacing;
                }
            }
        }

        let mut draws = Vec::with_capacity(placed.len() * (self.outline.len() + 1));
        for p in &placed {
            for &(dx, dy) in &self.outline {
                draws.push(TextDraw {
                    text: p.text.clone(),
                    x: p.x + dx,
                    y: top + dy,
                    color: self.style.outline,
                });
            }
        }
        for p in &placed {
            draws.push(TextDraw {
                text: p.text.clone(),
                x: p.x,
                y: top,
                color: if p.highlighted {
                    self.style.highlight
                } else {
                    self.style.normal
                },
            });
        }

        Ok(LinePlan {
            line_width,
            top,
            words: placed,
            draws,
        })
    }

    /// Compose `words` over a copy of `background`. The background is never modified; with
    /// no words the copy is byte-identical.
    pub fn render(
        &mut self,
        background: &FrameRGBA,
        words: &[ResolvedWord],
        direction: TextDirection,
    ) -> SingalongResult<FrameRGBA> {
        let mut frame = background.clone();
        if words.is_empty() {
            return Ok(frame);
        }
        let plan = self.layout(words, direction, background.width, background.height)?;
        self.backend.draw_batch(&mut frame, &plan.draws)?;
        Ok(frame)
    }
}

fn place(w: &ResolvedWord, x: f32, width: f32) -> PlacedWord {
    PlacedWord {
        text: w.text.clone(),
        x,
        width,
        highlighted: w.highlighted,
    }
}
