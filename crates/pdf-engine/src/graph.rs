//! Narrow interface over a document's page resource/content graph.
//!
//! The annotation store only ever inserts or removes whole sticker images
//! through this trait, so the PDF library underneath can change without
//! touching placement logic.

use crate::EngineError;
use doc_model::{AnnotationRecord, ObjectRef, PageSize, PdfRect, StickerImage};

/// Objects written into a page for one sticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSticker {
    /// Image XObject.
    pub image: ObjectRef,
    /// Content stream that draws the image.
    pub content: ObjectRef,
    /// Key of the image in the page's `/XObject` resources.
    pub resource_name: String,
}

impl From<&AnnotationRecord> for EmbeddedSticker {
    fn from(record: &AnnotationRecord) -> Self {
        Self {
            image: record.embedded_object_id,
            content: record.content_object_id,
            resource_name: record.resource_name.clone(),
        }
    }
}

pub trait PageGraph {
    fn page_count(&self) -> u32;

    fn page_size(&self, page_index: u32) -> Result<PageSize, EngineError>;

    /// Embeds `image` as a new image resource of the page, drawn over `rect`
    /// (page space).
    fn insert_image(
        &mut self,
        page_index: u32,
        rect: PdfRect,
        image: &StickerImage,
    ) -> Result<EmbeddedSticker, EngineError>;

    /// Removes the image resource and its drawing operation. Fails with
    /// [`EngineError::StaleReference`] unless the page still [owns](Self::owns)
    /// the sticker.
    fn remove_image(&mut self, page_index: u32, embedded: &EmbeddedSticker)
        -> Result<(), EngineError>;

    /// Whether `image` is still an image resource of the page.
    fn resolves(&self, page_index: u32, image: ObjectRef) -> bool;

    /// Whether the page still carries exactly this sticker: `resource_name`
    /// maps to `image`, and `content` is one of the page's content streams
    /// whose only drawing is `q <matrix> cm /resource_name Do Q`.
    fn owns(&self, page_index: u32, embedded: &EmbeddedSticker) -> bool;

    /// Rectangle the sticker is currently drawn at, read back from the page
    /// content.
    fn placed_rect(&self, page_index: u32, embedded: &EmbeddedSticker) -> Option<PdfRect>;

    /// Image resources of the page, stickers included.
    fn image_resource_count(&self, page_index: u32) -> usize;
}
