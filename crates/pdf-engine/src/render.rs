//! Page rasterization boundary.
//!
//! Real rasterizers plug in behind [`RenderPipeline`]. The built-in
//! [`PlaceholderRenderer`] paints a blank page and composites the page's
//! image XObjects, which is enough to show scans and placed stickers.

use crate::PdfDocument;
use doc_model::PdfRect;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};
use lopdf::{Object, ObjectId};
use std::fmt;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Largest raster edge a pipeline is asked to allocate.
pub const MAX_RASTER_SIDE_PX: u32 = 16_384;

const PAGE_RGBA: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE_RGBA: Rgba<u8> = Rgba([220, 220, 220, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PixelFormat {
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8 => 4,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Bytes per row.
    pub stride: u32,
    pub bytes: Vec<u8>,
}

impl Raster {
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixel_format: PixelFormat::Rgba8,
            stride: width * PixelFormat::Rgba8.bytes_per_pixel(),
            bytes: image.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if self.stride != self.width * self.pixel_format.bytes_per_pixel() {
            return None;
        }
        RgbaImage::from_raw(self.width, self.height, self.bytes.clone())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y * self.stride + x * self.pixel_format.bytes_per_pixel()) as usize;
        let px = self.bytes.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_format", &self.pixel_format)
            .field("stride", &self.stride)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("could not render page {page_index}: {reason}")]
pub struct RenderFailure {
    pub page_index: u32,
    pub reason: String,
}

impl RenderFailure {
    pub fn new(page_index: u32, reason: impl Into<String>) -> Self {
        Self { page_index, reason: reason.into() }
    }
}

pub trait RenderPipeline {
    /// Rasterizes one page at `effective_dpi`; the raster is
    /// `page_size * effective_dpi / 72` pixels on each side.
    fn render(
        &self,
        document: &PdfDocument,
        page_index: u32,
        effective_dpi: f32,
    ) -> Result<Raster, RenderFailure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderRenderer;

impl RenderPipeline for PlaceholderRenderer {
    fn render(
        &self,
        document: &PdfDocument,
        page_index: u32,
        effective_dpi: f32,
    ) -> Result<Raster, RenderFailure> {
        if !effective_dpi.is_finite() || effective_dpi <= 0.0 {
            return Err(RenderFailure::new(page_index, format!("invalid dpi {effective_dpi}")));
        }

        let page_size = document
            .page_size(page_index)
            .map_err(|err| RenderFailure::new(page_index, err.to_string()))?;
        let scale = effective_dpi / 72.0;

        let width = (page_size.width_pt * scale).round().max(1.0);
        let height = (page_size.height_pt * scale).round().max(1.0);
        if width > MAX_RASTER_SIDE_PX as f32 || height > MAX_RASTER_SIDE_PX as f32 {
            return Err(RenderFailure::new(
                page_index,
                format!("raster {width}x{height} exceeds {MAX_RASTER_SIDE_PX}px"),
            ));
        }
        let (width, height) = (width as u32, height as u32);

        let mut image = RgbaImage::from_pixel(width, height, PAGE_RGBA);

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, EDGE_RGBA);
                image.put_pixel(x, height - 1, EDGE_RGBA);
            }
            for y in 0..height {
                image.put_pixel(0, y, EDGE_RGBA);
                image.put_pixel(width - 1, y, EDGE_RGBA);
            }
        }

        let draws = document
            .image_draws(page_index)
            .map_err(|err| RenderFailure::new(page_index, err.to_string()))?;

        for (rect, image_id) in draws {
            match decode_image(document, image_id) {
                Some(source) => composite(&mut image, &source, rect, scale),
                None => {
                    log::debug!("page {}: skipping undecodable image {image_id:?}", page_index + 1)
                }
            }
        }

        Ok(Raster::from_rgba(image))
    }
}

fn composite(page: &mut RgbaImage, source: &RgbaImage, rect: PdfRect, scale: f32) {
    let width = (rect.width() * scale).round();
    let height = (rect.height() * scale).round();
    let limit = MAX_RASTER_SIDE_PX as f32;
    if width < 1.0 || height < 1.0 || width > limit || height > limit {
        return;
    }

    let scaled = imageops::resize(source, width as u32, height as u32, FilterType::Triangle);
    let left = (rect.x0 * scale).round() as i64;
    let top = (rect.y0 * scale).round() as i64;
    imageops::overlay(page, &scaled, left, top);
}

/// Decodes 8-bit DeviceRGB or DeviceGray samples, applying a soft mask when
/// present. Filters other than Flate are not supported.
fn decode_image(document: &PdfDocument, image_id: ObjectId) -> Option<RgbaImage> {
    let doc = document.lopdf();
    let stream = doc.get_object(image_id).and_then(Object::as_stream).ok()?;
    let dict = &stream.dict;

    let width = u32::try_from(dict.get(b"Width").and_then(Object::as_i64).ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").and_then(Object::as_i64).ok()?).ok()?;
    if dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok()? != 8 {
        return None;
    }

    let samples = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
    let pixels = width as usize * height as usize;

    let alpha = dict
        .get(b"SMask")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_stream)
        .ok()
        .map(|mask| mask.decompressed_content().unwrap_or_else(|_| mask.content.clone()))
        .filter(|mask| mask.len() >= pixels);

    let color_space = dict.get(b"ColorSpace").and_then(Object::as_name).ok()?;
    let channels = match color_space {
        b"DeviceRGB" => 3,
        b"DeviceGray" => 1,
        _ => return None,
    };
    if samples.len() < pixels * channels {
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for (index, px) in samples.chunks_exact(channels).take(pixels).enumerate() {
        let a = alpha.as_ref().map_or(u8::MAX, |mask| mask[index]);
        match px {
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, a]),
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, a]),
            _ => return None,
        }
    }

    RgbaImage::from_raw(width, height, rgba)
}
