//! View-side logic for a document tab: coordinate mapping, zoom, and render
//! request sequencing. Nothing here touches the PDF itself.

pub mod coords;
pub mod render_sequence;
pub mod zoom;

pub use coords::{
    display_to_pdf, displayed_size_for, pdf_to_display, points_per_pixel, sticker_rect, MapError,
    POINTS_PER_INCH,
};
pub use render_sequence::{RenderOutcome, RenderSequencer, RenderTicket};
pub use zoom::{ZoomController, ZoomDirection, ZoomState, ZOOM_STEP};
