//! lopdf-backed document access: opening, page geometry, sticker image
//! embedding and removal, the persisted sticker registry, and saving.

mod document;
mod graph;
mod render;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

use doc_model::{ObjectRef, PdfRect};
use std::path::PathBuf;

pub use document::PdfDocument;
pub use graph::{EmbeddedSticker, PageGraph};
pub use render::{
    PixelFormat, PlaceholderRenderer, Raster, RenderFailure, RenderPipeline, RgbaImage,
    MAX_RASTER_SIDE_PX,
};
pub use store::{AnnotationStore, DeletionReport};

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a PDF file (missing %PDF- header)")]
    NotAPdf,
    #[error("corrupt PDF: {0}")]
    Corrupt(String),
    #[error("encrypted PDFs are not supported")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF serialization error: {0}")]
    Serialize(#[from] lopdf::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("PDF structure error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("malformed page {page}: {reason}")]
    MalformedPage { page: u32, reason: String },
    #[error("sticker {0} no longer exists in the document")]
    StaleReference(ObjectRef),
    #[error("invalid sticker rectangle {0:?}")]
    InvalidRect(PdfRect),
    #[error("invalid sticker image {width}x{height}")]
    InvalidImage { width: u32, height: u32 },
}
