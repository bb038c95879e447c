//! Shared value types for the exhibit sticker workspace.
//!
//! Geometry comes in two flavours that must never be mixed up:
//! - display space: pixels of the raster currently shown for a page
//! - page space: points (1/72 inch) measured from the top-left corner of the
//!   page's media box, y growing downward like the displayed raster
//!
//! The PDF engine converts page space to native PDF user space (bottom-left
//! origin) only when it writes content streams.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Side length of every sticker canvas, in pixels.
pub const STICKER_SIZE_PX: u32 = 100;

/// Lowest zoom factor a document view may reach.
pub const MIN_ZOOM: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width_px: f32,
    pub height_px: f32,
}

impl DisplaySize {
    pub fn new(width_px: f32, height_px: f32) -> Self {
        Self { width_px, height_px }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Point in page space (points, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfPoint {
    pub x: f32,
    pub y: f32,
}

impl PdfPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in page space. `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PdfRect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) }
    }

    pub fn from_origin_size(origin: PdfPoint, width: f32, height: f32) -> Self {
        Self::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn contains(&self, point: PdfPoint) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Component-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &PdfRect, tolerance: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Indirect object reference inside a PDF (`<number> <generation> R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub number: u32,
    pub generation: u16,
}

impl ObjectRef {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl From<(u32, u16)> for ObjectRef {
    fn from((number, generation): (u32, u16)) -> Self {
        Self { number, generation }
    }
}

impl From<ObjectRef> for (u32, u16) {
    fn from(value: ObjectRef) -> Self {
        (value.number, value.generation)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Index entry for a sticker this workspace embedded into a page.
///
/// `embedded_object_id` is the image XObject and identifies the record. The
/// content stream and resource name locate the drawing operation so removal
/// leaves nothing behind. The page graph stays the source of truth: a record
/// whose image no longer resolves is stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub embedded_object_id: ObjectRef,
    pub content_object_id: ObjectRef,
    pub resource_name: String,
    pub page_index: u32,
    pub rect: PdfRect,
    pub top_text: String,
    pub bottom_text: String,
}

/// The two lines of text printed on a sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerText {
    pub top: String,
    pub bottom: String,
}

impl StickerText {
    pub fn new(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self { top: top.into(), bottom: bottom.into() }
    }
}

/// Immutable sticker raster: straight (non-premultiplied) RGBA8, row-major,
/// plus its PNG encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct StickerImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    png: Vec<u8>,
}

impl StickerImage {
    /// Returns `None` when the pixel buffer does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, png: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, rgba, png })
    }

    /// Uniformly coloured image without a PNG encoding.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color.repeat(width as usize * height as usize);
        Self { width, height, rgba, png: Vec::new() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rgba[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn is_opaque(&self) -> bool {
        self.rgba.chunks_exact(4).all(|px| px[3] == u8::MAX)
    }

    /// Colour samples without alpha, as a DeviceRGB image stream expects.
    pub fn rgb_samples(&self) -> Vec<u8> {
        self.rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect()
    }

    pub fn alpha_samples(&self) -> Vec<u8> {
        self.rgba.chunks_exact(4).map(|px| px[3]).collect()
    }
}

impl fmt::Debug for StickerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickerImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// User preferences shared by every open document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Rasterization density at zoom 1.0.
    pub base_dpi: f32,
    pub default_top_text: String,
    pub default_bottom_text: String,
    /// Scalable font tried before the built-in candidates.
    pub font_path: Option<PathBuf>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            base_dpi: 300.0,
            default_top_text: "Exhibit".to_owned(),
            default_bottom_text: "Bottom Text".to_owned(),
            font_path: None,
        }
    }
}

impl Preferences {
    pub fn default_sticker_text(&self) -> StickerText {
        StickerText::new(self.default_top_text.clone(), self.default_bottom_text.clone())
    }
}
