use std::collections::HashMap;

use crate::{
    foundation::error::{SingalongError, SingalongResult},
    render::{
        backend::{TextBackend, TextDraw},
        composite::over_in_place,
        frame::FrameRGBA,
    },
};

/// RGBA8 brush carried through Parley layouts. Colour is chosen per draw, so layouts are
/// built with the default brush and reused for every colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Parley shaping + `vello_cpu` glyph rasterisation for one TrueType/OpenType face.
///
/// All draws of a frame are rasterised into one transparent layer, which is then composited
/// over the frame in a single pass.
pub struct VelloTextBackend {
    size_px: f32,
    family_name: String,
    font: vello_cpu::peniko::FontData,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    layouts: HashMap<String, parley::Layout<TextBrushRgba8>>,
    line_height: Option<f32>,
    layer: Option<vello_cpu::Pixmap>,
}

impl VelloTextBackend {
    /// Register `font_bytes` and prepare a backend rendering at `size_px`.
    pub fn new(font_bytes: &[u8], size_px: f32) -> SingalongResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(SingalongError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            SingalongError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SingalongError::validation("registered font family has no name"))?
            .to_string();

        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes.to_vec()), 0);

        Ok(Self {
            size_px,
            family_name,
            font,
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            layouts: HashMap::new(),
            line_height: None,
            layer: None,
        })
    }

    /// Family name reported by the registered face.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    fn ensure_layout(&mut self, text: &str) {
        if self.layouts.contains_key(text) {
            return;
        }
        let layout = build_layout(
            &mut self.font_ctx,
            &mut self.layout_ctx,
            &self.family_name,
            self.size_px,
            text,
        );
        self.layouts.insert(text.to_string(), layout);
    }

    fn take_layer(&mut self, width: u32, height: u32) -> SingalongResult<vello_cpu::Pixmap> {
        let w: u16 = width
            .try_into()
            .map_err(|_| SingalongError::evaluation("frame width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| SingalongError::evaluation("frame height exceeds u16"))?;
        match self.layer.take() {
            Some(mut p) if p.width() == w && p.height() == h => {
                p.data_as_u8_slice_mut().fill(0);
                Ok(p)
            }
            _ => Ok(vello_cpu::Pixmap::new(w, h)),
        }
    }
}

fn build_layout(
    font_ctx: &mut parley::FontContext,
    layout_ctx: &mut parley::LayoutContext<TextBrushRgba8>,
    family_name: &str,
    size_px: f32,
    text: &str,
) -> parley::Layout<TextBrushRgba8> {
    let mut builder = layout_ctx.ranged_builder(font_ctx, text, 1.0, true);
    builder.push_default(parley::style::StyleProperty::FontStack(
        parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name.to_string())),
    ));
    builder.push_default(parley::style::StyleProperty::FontSize(size_px));
    builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8::default()));

    let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
    layout.break_all_lines(None);
    layout
}

impl TextBackend for VelloTextBackend {
    fn measure_width(&mut self, text: &str) -> SingalongResult<f32> {
        self.ensure_layout(text);
        Ok(self.layouts.get(text).map(|l| l.width()).unwrap_or(0.0))
    }

    fn line_height(&mut self) -> f32 {
        if let Some(h) = self.line_height {
            return h;
        }
        let sized = build_layout(
            &mut self.font_ctx,
            &mut self.layout_ctx,
            &self.family_name,
            self.size_px,
            "Hg",
        );
        let h = sized.height().max(self.size_px);
        self.line_height = Some(h);
        h
    }

    fn draw_text(&mut self, frame: &mut FrameRGBA, draw: &TextDraw) -> SingalongResult<()> {
        self.draw_batch(frame, std::slice::from_ref(draw))
    }

    fn draw_batch(&mut self, frame: &mut FrameRGBA, draws: &[TextDraw]) -> SingalongResult<()> {
        if draws.is_empty() {
            return Ok(());
        }
        for d in draws {
            self.ensure_layout(&d.text);
        }

        let mut layer = self.take_layer(frame.width, frame.height)?;
        let mut ctx = vello_cpu::RenderContext::new(layer.width(), layer.height());
        for d in draws {
            let Some(layout) = self.layouts.get(&d.text) else {
                continue;
            };
            ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                f64::from(d.x),
                f64::from(d.y),
            )));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                d.color.r, d.color.g, d.color.b, d.color.a,
            ));
            for line in layout.lines() {
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut layer);

        let res = over_in_place(&mut frame.data, layer.data_as_u8_slice(), 1.0);
        self.layer = Some(layer);
        res
    }

    fn name(&self) -> &'static str {
        "vello-cpu"
    }
}
