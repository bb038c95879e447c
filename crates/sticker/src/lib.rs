//! Sticker composition.
//!
//! A sticker is a fixed 100×100 raster: yellow rounded rectangle with a thick
//! black outline and two centred lines of text. Font, colours and size are
//! constants so every sticker in a document looks the same.

pub mod bitmap_font;
pub mod font;

use doc_model::{StickerImage, StickerText, STICKER_SIZE_PX};
use std::path::Path;
use tiny_skia::{
    Color, FillRule, Paint, Path as SkPath, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

pub use font::{Coverage, StickerFont, TEXT_SIZE_PX};

pub const CORNER_RADIUS_PX: f32 = 20.0;
pub const BORDER_WIDTH_PX: f32 = 6.0;

const FILL_RGB: [u8; 3] = [255, 255, 0];
const INK_RGB: [u8; 3] = [0, 0, 0];

/// Cubic Bézier handle length for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug)]
pub struct StickerComposer {
    font: StickerFont,
}

impl StickerComposer {
    /// Resolves the sticker font once; see [`StickerFont::resolve`].
    pub fn new(preferred_font: Option<&Path>) -> Self {
        Self { font: StickerFont::resolve(preferred_font) }
    }

    pub fn with_font(font: StickerFont) -> Self {
        Self { font }
    }

    pub fn font(&self) -> &StickerFont {
        &self.font
    }

    pub fn compose_text(&self, text: &StickerText) -> StickerImage {
        self.compose(&text.top, &text.bottom)
    }

    pub fn compose(&self, top_text: &str, bottom_text: &str) -> StickerImage {
        let size = STICKER_SIZE_PX;
        let Some(mut pixmap) = Pixmap::new(size, size) else {
            log::error!("could not allocate a {size}x{size} sticker canvas");
            return solid_sticker(size);
        };

        draw_frame(&mut pixmap);

        let mut coverage = Coverage::new(size, size);
        let (width, height) = (size as f32, size as f32);
        self.font.draw_centered(&mut coverage, top_text, width / 2.0, height / 3.0);
        self.font.draw_centered(&mut coverage, bottom_text, width / 2.0, 2.0 * height / 3.0);
        apply_ink(&mut pixmap, &coverage);

        let png = match pixmap.encode_png() {
            Ok(png) => png,
            Err(err) => {
                log::warn!("sticker PNG encoding failed: {err}");
                Vec::new()
            }
        };

        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let color = px.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();

        StickerImage::from_rgba(size, size, rgba, png).unwrap_or_else(|| solid_sticker(size))
    }
}

impl Default for StickerComposer {
    fn default() -> Self {
        Self::new(None)
    }
}

fn paint(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], u8::MAX);
    paint.anti_alias = true;
    paint
}

fn draw_frame(pixmap: &mut Pixmap) {
    let size = pixmap.width() as f32;
    pixmap.fill(Color::from_rgba8(FILL_RGB[0], FILL_RGB[1], FILL_RGB[2], u8::MAX));

    if let Some(outer) = Rect::from_ltrb(0.0, 0.0, size, size)
        .and_then(|rect| rounded_rect(rect, CORNER_RADIUS_PX))
    {
        pixmap.fill_path(&outer, &paint(FILL_RGB), FillRule::Winding, Transform::identity(), None);
    }

    // Stroke centred half a border inside the edge so the whole outline
    // stays on the canvas with its outer radius equal to CORNER_RADIUS_PX.
    let inset = BORDER_WIDTH_PX / 2.0;
    if let Some(outline) = Rect::from_ltrb(inset, inset, size - inset, size - inset)
        .and_then(|rect| rounded_rect(rect, CORNER_RADIUS_PX - inset))
    {
        let stroke = Stroke { width: BORDER_WIDTH_PX, ..Stroke::default() };
        pixmap.stroke_path(&outline, &paint(INK_RGB), &stroke, Transform::identity(), None);
    }
}

fn rounded_rect(rect: Rect, radius: f32) -> Option<SkPath> {
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let radius = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
    let k = radius * KAPPA;

    let mut pb = PathBuilder::new();
    pb.move_to(l + radius, t);
    pb.line_to(r - radius, t);
    pb.cubic_to(r - radius + k, t, r, t + radius - k, r, t + radius);
    pb.line_to(r, b - radius);
    pb.cubic_to(r, b - radius + k, r - radius + k, b, r - radius, b);
    pb.line_to(l + radius, b);
    pb.cubic_to(l + radius - k, b, l, b - radius + k, l, b - radius);
    pb.line_to(l, t + radius);
    pb.cubic_to(l, t + radius - k, l + radius - k, t, l + radius, t);
    pb.close();
    pb.finish()
}

/// Darkens the opaque canvas towards the ink colour by the text coverage.
fn apply_ink(pixmap: &mut Pixmap, coverage: &Coverage) {
    let width = pixmap.width();
    let data = pixmap.data_mut();

    for (index, px) in data.chunks_exact_mut(4).enumerate() {
        let x = index as u32 % width;
        let y = index as u32 / width;
        let alpha = coverage.get(x, y) as u32;
        if alpha == 0 {
            continue;
        }

        for (channel, ink) in px.iter_mut().take(3).zip(INK_RGB) {
            *channel = ((*channel as u32 * (255 - alpha) + ink as u32 * alpha) / 255) as u8;
        }
    }
}

fn solid_sticker(size: u32) -> StickerImage {
    StickerImage::solid(size, size, [FILL_RGB[0], FILL_RGB[1], FILL_RGB[2], u8::MAX])
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn canvas_is_always_100_square(top in ".{0,60}", bottom in ".{0,60}") {
            let sticker = StickerComposer::with_font(StickerFont::Bitmap).compose(&top, &bottom);
            prop_assert_eq!(sticker.width(), STICKER_SIZE_PX);
            prop_assert_eq!(sticker.height(), STICKER_SIZE_PX);
            prop_assert_eq!(sticker.rgba().len(), (STICKER_SIZE_PX * STICKER_SIZE_PX * 4) as usize);
        }
    }
}
