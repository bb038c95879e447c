//! Display space ↔ page space mapping.
//!
//! The displayed raster already carries the zoom factor (it was rasterized at
//! `base_dpi * zoom`), so the mapping only needs the page size and the size of
//! the raster actually on screen. Applying zoom here again would double it.

use doc_model::{DisplayPoint, DisplaySize, PageSize, PdfPoint, PdfRect};

/// Points per inch in PDF user space.
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("no page is displayed (viewport width is zero)")]
    DegenerateViewport,
}

/// Page points per display pixel. A single horizontal factor is used for
/// both axes since the renderer preserves the page aspect ratio.
pub fn points_per_pixel(page_size: PageSize, displayed: DisplaySize) -> Result<f32, MapError> {
    if !(displayed.width_px.is_finite() && displayed.width_px > 0.0) {
        return Err(MapError::DegenerateViewport);
    }

    Ok(page_size.width_pt / displayed.width_px)
}

pub fn display_to_pdf(
    point: DisplayPoint,
    page_size: PageSize,
    displayed: DisplaySize,
) -> Result<PdfPoint, MapError> {
    let scale = points_per_pixel(page_size, displayed)?;
    Ok(PdfPoint::new(point.x * scale, point.y * scale))
}

pub fn pdf_to_display(
    point: PdfPoint,
    page_size: PageSize,
    displayed: DisplaySize,
) -> Result<DisplayPoint, MapError> {
    let scale = points_per_pixel(page_size, displayed)?;
    if scale == 0.0 {
        return Err(MapError::DegenerateViewport);
    }

    Ok(DisplayPoint::new(point.x / scale, point.y / scale))
}

/// Placement rectangle for a sticker whose top-left corner lands on `origin`.
///
/// The sticker's pixels map 1:1 onto points, so a sticker has the same
/// physical size whatever the zoom was when it was placed.
pub fn sticker_rect(origin: PdfPoint, sticker_width_px: u32, sticker_height_px: u32) -> PdfRect {
    PdfRect::from_origin_size(origin, sticker_width_px as f32, sticker_height_px as f32)
}

/// Size of the raster a page produces at `effective_dpi`.
pub fn displayed_size_for(page_size: PageSize, effective_dpi: f32) -> DisplaySize {
    let scale = effective_dpi / POINTS_PER_INCH;
    DisplaySize::new(
        (page_size.width_pt * scale).round().max(1.0),
        (page_size.height_pt * scale).round().max(1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    #[test]
    fn maps_click_with_horizontal_scale_on_both_axes() {
        let displayed = DisplaySize::new(2550.0, 3300.0);
        let pdf = display_to_pdf(DisplayPoint::new(1275.0, 330.0), LETTER, displayed)
            .expect("viewport is valid");

        assert!((pdf.x - 306.0).abs() < 1e-3);
        assert!((pdf.y - 79.2).abs() < 1e-3);
    }

    #[test]
    fn zero_width_viewport_is_degenerate() {
        let result =
            display_to_pdf(DisplayPoint::new(1.0, 1.0), LETTER, DisplaySize::new(0.0, 0.0));
        assert_eq!(result, Err(MapError::DegenerateViewport));

        let result = pdf_to_display(PdfPoint::new(1.0, 1.0), LETTER, DisplaySize::new(0.0, 10.0));
        assert_eq!(result, Err(MapError::DegenerateViewport));
    }

    #[test]
    fn nan_viewport_is_degenerate() {
        let result =
            display_to_pdf(DisplayPoint::new(1.0, 1.0), LETTER, DisplaySize::new(f32::NAN, 5.0));
        assert_eq!(result, Err(MapError::DegenerateViewport));
    }

    #[test]
    fn sticker_rect_is_fixed_size_in_points() {
        let rect = sticker_rect(PdfPoint::new(40.0, 60.0), 100, 100);
        assert_eq!(rect, PdfRect::new(40.0, 60.0, 140.0, 160.0));
    }

    #[test]
    fn displayed_size_tracks_effective_dpi() {
        assert_eq!(displayed_size_for(LETTER, 72.0), DisplaySize::new(612.0, 792.0));
        assert_eq!(displayed_size_for(LETTER, 300.0), DisplaySize::new(2550.0, 3300.0));
    }

    #[test]
    fn zoom_is_carried_by_the_displayed_size_only() {
        let click = DisplayPoint::new(500.0, 500.0);
        let at_1x = display_to_pdf(click, LETTER, displayed_size_for(LETTER, 300.0))
            .expect("viewport is valid");
        let at_2x = display_to_pdf(
            DisplayPoint::new(click.x * 2.0, click.y * 2.0),
            LETTER,
            displayed_size_for(LETTER, 600.0),
        )
        .expect("viewport is valid");

        assert!((at_1x.x - at_2x.x).abs() < 1e-3);
        assert!((at_1x.y - at_2x.y).abs() < 1e-3);
    }
}
