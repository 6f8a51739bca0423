use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::{
        core::{Canvas, Rgba8},
        error::{SingalongError, SingalongResult},
    },
    render::frame::FrameRGBA,
};

/// Decode an image file into an opaque frame of `canvas` size.
///
/// With `canvas = None` the image keeps its own size, rounded down to even dimensions
/// (required for yuv420p output).
#[tracing::instrument(skip(canvas))]
pub fn load_background(path: &Path, canvas: Option<Canvas>) -> SingalongResult<FrameRGBA> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read background '{}'", path.display()))?;
    decode_background(&bytes, canvas)
}

/// Decode encoded image bytes (PNG, JPEG, ...) into an opaque frame.
pub fn decode_background(bytes: &[u8], canvas: Option<Canvas>) -> SingalongResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes).context("decode background image")?;
    let rgba = dyn_img.to_rgba8();
    let (src_w, src_h) = rgba.dimensions();

    let target = match canvas {
        Some(c) => c,
        None => Canvas {
            width: src_w & !1,
            height: src_h & !1,
        },
    };
    if target.width == 0 || target.height == 0 {
        return Err(SingalongError::validation(format!(
            "background {src_w}x{src_h} is too small for a {}x{} canvas",
            target.width, target.height
        )));
    }

    let rgba = if (src_w, src_h) == (target.width, target.height) {
        rgba
    } else {
        tracing::debug!(
            from = %format!("{src_w}x{src_h}"),
            to = %format!("{}x{}", target.width, target.height),
            "resizing background"
        );
        image::imageops::resize(
            &rgba,
            target.width,
            target.height,
            image::imageops::FilterType::Lanczos3,
        )
    };

    let mut data = rgba.into_raw();
    flatten_over_black_in_place(&mut data);
    Ok(FrameRGBA {
        width: target.width,
        height: target.height,
        data,
        premultiplied: true,
    })
}

/// Flat background of one colour, used when no image is supplied.
pub fn solid_background(canvas: Canvas, color: Rgba8) -> SingalongResult<FrameRGBA> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(SingalongError::validation("canvas width/height must be > 0"));
    }
    let opaque = Rgba8 { a: 255, ..color };
    Ok(FrameRGBA::filled(canvas.width, canvas.height, opaque.to_premul()))
}

fn flatten_over_black_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
        px[3] = 255;
    }
}
