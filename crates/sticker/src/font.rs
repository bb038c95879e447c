//! Font resolution and text coverage rendering for stickers.

use crate::bitmap_font;
use std::fmt;
use std::path::{Path, PathBuf};

/// Pixel size of sticker text when a scalable font is available.
pub const TEXT_SIZE_PX: f32 = 20.0;

/// Scalable fonts tried after the configured one, in order.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Single-channel coverage buffer that text is rendered into before it is
/// composited onto the sticker.
#[derive(Debug, Clone)]
pub struct Coverage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Coverage {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, data: vec![0; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Out-of-bounds writes are clipped.
    fn add(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.data[index] = self.data[index].max(value);
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|value| *value == 0)
    }
}

pub enum StickerFont {
    Scalable { font: fontdue::Font, source: PathBuf },
    Bitmap,
}

impl fmt::Debug for StickerFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalable { source, .. } => f.debug_tuple("Scalable").field(source).finish(),
            Self::Bitmap => f.write_str("Bitmap"),
        }
    }
}

impl StickerFont {
    /// First loadable font among `preferred` and the system candidates, or
    /// the built-in bitmap font. Never fails.
    pub fn resolve(preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            match Self::load(&path) {
                Ok(font) => {
                    log::debug!("sticker font: {}", path.display());
                    return font;
                }
                Err(reason) => log::debug!("skipping font {}: {reason}", path.display()),
            }
        }

        log::warn!("no scalable font found, stickers use the built-in bitmap font");
        Self::Bitmap
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|err| err.to_string())?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(str::to_owned)?;

        Ok(Self::Scalable { font, source: path.to_path_buf() })
    }

    pub fn is_scalable(&self) -> bool {
        matches!(self, Self::Scalable { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Scalable { source, .. } => source.display().to_string(),
            Self::Bitmap => "built-in 5x7 bitmap".to_owned(),
        }
    }

    /// Renders `text` with its middle anchored at (`cx`, `cy`).
    pub fn draw_centered(&self, coverage: &mut Coverage, text: &str, cx: f32, cy: f32) {
        match self {
            Self::Scalable { font, .. } => draw_scalable(font, coverage, text, cx, cy),
            Self::Bitmap => draw_bitmap(coverage, text, cx, cy),
        }
    }
}

fn draw_scalable(font: &fontdue::Font, coverage: &mut Coverage, text: &str, cx: f32, cy: f32) {
    let glyphs: Vec<_> = text.chars().map(|ch| font.rasterize(ch, TEXT_SIZE_PX)).collect();
    let advance: f32 = glyphs.iter().map(|(metrics, _)| metrics.advance_width).sum();

    let (ascent, descent) = font
        .horizontal_line_metrics(TEXT_SIZE_PX)
        .map(|line| (line.ascent, line.descent))
        .unwrap_or((TEXT_SIZE_PX * 0.8, -TEXT_SIZE_PX * 0.2));

    let (mut pen, baseline) = centred_origin(advance, ascent, descent, cx, cy);

    for (metrics, bitmap) in &glyphs {
        let left = (pen + metrics.xmin as f32).round() as i32;
        let top = (baseline - metrics.ymin as f32 - metrics.height as f32).round() as i32;

        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let value = bitmap[row * metrics.width + col];
                if value > 0 {
                    coverage.add(left + col as i32, top + row as i32, value);
                }
            }
        }

        pen += metrics.advance_width;
    }
}

/// Pen start and baseline that centre a run `advance` wide on (`cx`, `cy`).
/// The vertical middle sits halfway between the ascender and descender lines.
fn centred_origin(advance: f32, ascent: f32, descent: f32, cx: f32, cy: f32) -> (f32, f32) {
    (cx - advance / 2.0, cy + (ascent + descent) / 2.0)
}

/// Largest integer scale at which `text` fits inside the sticker border.
fn bitmap_scale(chars: usize, available_width: u32) -> u32 {
    if bitmap_font::text_width(chars) * 2 <= available_width {
        2
    } else {
        1
    }
}

fn draw_bitmap(coverage: &mut Coverage, text: &str, cx: f32, cy: f32) {
    let chars: Vec<char> = text.chars().collect();
    let available = coverage.width().saturating_sub(2 * crate::BORDER_WIDTH_PX as u32);
    let scale = bitmap_scale(chars.len(), available);

    let width = (bitmap_font::text_width(chars.len()) * scale) as f32;
    let height = (bitmap_font::GLYPH_HEIGHT * scale) as f32;
    let left = (cx - width / 2.0).round() as i32;
    let top = (cy - height / 2.0).round() as i32;
    let pitch = ((bitmap_font::GLYPH_WIDTH + bitmap_font::GLYPH_SPACING) * scale) as i32;

    for (index, ch) in chars.iter().enumerate() {
        let glyph = bitmap_font::glyph(*ch);
        let origin_x = left + index as i32 * pitch;

        for col in 0..bitmap_font::GLYPH_WIDTH {
            for row in 0..bitmap_font::GLYPH_HEIGHT {
                if !bitmap_font::is_set(glyph, col, row) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        coverage.add(
                            origin_x + (col * scale + dx) as i32,
                            top + (row * scale + dy) as i32,
                            u8::MAX,
                        );
                    }
                }
            }
        }
    }
}
