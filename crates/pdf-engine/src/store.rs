//! Per-document index of placed stickers, and the operations that keep it in
//! step with the page graph.

use crate::graph::{EmbeddedSticker, PageGraph};
use crate::EngineError;
use doc_model::{AnnotationRecord, ObjectRef, PdfPoint, PdfRect, StickerImage, StickerText};
use std::collections::BTreeMap;

/// Result of removing the stickers of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct DeletionReport {
    pub removed: usize,
    /// Tracked images that no longer resolved and were skipped.
    pub stale: Vec<ObjectRef>,
    /// Stickers the page graph refused to remove. Their records stay tracked.
    pub failed: Vec<ObjectRef>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    pages: BTreeMap<u32, Vec<AnnotationRecord>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.pages.entry(record.page_index).or_default().push(record);
        }
        store
    }

    /// Embeds `sticker` on the page at `rect` and starts tracking it.
    pub fn place<G: PageGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        page_index: u32,
        rect: PdfRect,
        sticker: StickerImage,
        text: &StickerText,
    ) -> Result<AnnotationRecord, EngineError> {
        let embedded = graph.insert_image(page_index, rect, &sticker)?;

        let record = AnnotationRecord {
            embedded_object_id: embedded.image,
            content_object_id: embedded.content,
            resource_name: embedded.resource_name,
            page_index,
            rect,
            top_text: text.top.clone(),
            bottom_text: text.bottom.clone(),
        };

        log::info!(
            "placed sticker {} on page {} at [{:.1} {:.1} {:.1} {:.1}]",
            record.embedded_object_id,
            page_index + 1,
            rect.x0,
            rect.y0,
            rect.x1,
            rect.y1
        );

        self.pages.entry(page_index).or_default().push(record.clone());
        Ok(record)
    }

    /// Removes every tracked sticker of the page. Untracked images (original
    /// page content) are never touched. Stale records are skipped, reported
    /// and forgotten; records whose removal failed for another reason are
    /// reported and kept.
    pub fn delete_all<G: PageGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        page_index: u32,
    ) -> DeletionReport {
        let mut report = DeletionReport::default();
        let Some(records) = self.pages.remove(&page_index) else {
            return report;
        };

        let mut kept = Vec::new();
        for record in records {
            let embedded = EmbeddedSticker::from(&record);
            match graph.remove_image(page_index, &embedded) {
                Ok(()) => {
                    log::info!("deleted sticker {} from page {}", embedded.image, page_index + 1);
                    report.removed += 1;
                }
                Err(EngineError::StaleReference(id)) => {
                    log::warn!("sticker {id} on page {} no longer exists, skipped", page_index + 1);
                    report.stale.push(id);
                }
                Err(err) => {
                    log::warn!("could not delete sticker {}: {err}", embedded.image);
                    report.failed.push(embedded.image);
                    kept.push(record);
                }
            }
        }

        if !kept.is_empty() {
            self.pages.insert(page_index, kept);
        }
        report
    }

    /// Drops records the page no longer [owns](PageGraph::owns) and returns
    /// their image ids.
    pub fn reconcile<G: PageGraph + ?Sized>(&mut self, graph: &G) -> Vec<ObjectRef> {
        let mut dropped = Vec::new();

        for (page_index, records) in self.pages.iter_mut() {
            records.retain(|record| {
                let alive = *page_index < graph.page_count()
                    && graph.owns(*page_index, &EmbeddedSticker::from(record));
                if !alive {
                    log::warn!(
                        "dropping stale sticker record {} (page {})",
                        record.embedded_object_id,
                        page_index + 1
                    );
                    dropped.push(record.embedded_object_id);
                }
                alive
            });
        }

        self.pages.retain(|_, records| !records.is_empty());
        dropped
    }

    pub fn records(&self, page_index: u32) -> &[AnnotationRecord] {
        self.pages.get(&page_index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records ordered by page, then placement order.
    pub fn all_records(&self) -> Vec<AnnotationRecord> {
        self.pages.values().flatten().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn is_tracked(&self, image: ObjectRef) -> bool {
        self.pages.values().flatten().any(|record| record.embedded_object_id == image)
    }

    /// Topmost (most recently placed) sticker covering `point`.
    pub fn record_at(&self, page_index: u32, point: PdfPoint) -> Option<&AnnotationRecord> {
        self.records(page_index).iter().rev().find(|record| record.rect.contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::PdfDocument;
    use doc_model::{PageSize, StickerImage};

    fn sticker() -> StickerImage {
        StickerImage::solid(100, 100, [255, 255, 0, 255])
    }

    fn text() -> StickerText {
        StickerText::new("Exhibit", "A")
    }

    fn scanned_document() -> PdfDocument {
        PdfDocument::open_bytes(&fixtures::scanned_pdf(2)).expect("fixture should open")
    }

    /// Record claiming the page's scan and its original content stream.
    fn forged_scan_record(doc: &PdfDocument, page_index: u32) -> AnnotationRecord {
        let page_id = doc.lopdf().get_pages()[&(page_index + 1)];
        let original = doc.lopdf().get_page_contents(page_id)[0];
        let (_, scan) = doc.image_draws(page_index).expect("draws")[0];

        AnnotationRecord {
            embedded_object_id: scan.into(),
            content_object_id: original.into(),
            resource_name: fixtures::SCAN_RESOURCE_NAME.to_owned(),
            page_index,
            rect: PdfRect::new(0.0, 0.0, 612.0, 792.0),
            top_text: String::new(),
            bottom_text: String::new(),
        }
    }

    /// Page graph that refuses every removal.
    struct ReadOnly(PdfDocument);

    impl PageGraph for ReadOnly {
        fn page_count(&self) -> u32 {
            self.0.page_count()
        }

        fn page_size(&self, page_index: u32) -> Result<PageSize, EngineError> {
            self.0.page_size(page_index)
        }

        fn insert_image(
            &mut self,
            page_index: u32,
            rect: PdfRect,
            image: &StickerImage,
        ) -> Result<EmbeddedSticker, EngineError> {
            self.0.insert_image(page_index, rect, image)
        }

        fn remove_image(
            &mut self,
            page_index: u32,
            _: &EmbeddedSticker,
        ) -> Result<(), EngineError> {
            Err(EngineError::MalformedPage { page: page_index, reason: "read-only".to_owned() })
        }

        fn resolves(&self, page_index: u32, image: ObjectRef) -> bool {
            self.0.resolves(page_index, image)
        }

        fn owns(&self, page_index: u32, embedded: &EmbeddedSticker) -> bool {
            self.0.owns(page_index, embedded)
        }

        fn placed_rect(&self, page_index: u32, embedded: &EmbeddedSticker) -> Option<PdfRect> {
            self.0.placed_rect(page_index, embedded)
        }

        fn image_resource_count(&self, page_index: u32) -> usize {
            self.0.image_resource_count(page_index)
        }
    }

    #[test]
    fn place_tracks_record_on_its_page() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();
        let rect = PdfRect::new(10.0, 20.0, 110.0, 120.0);

        let record =
            store.place(&mut doc, 1, rect, sticker(), &text()).expect("placement should succeed");

        assert_eq!(record.page_index, 1);
        assert_eq!(record.rect, rect);
        assert_eq!(record.top_text, "Exhibit");
        assert_eq!(store.records(1), &[record.clone()]);
        assert!(store.records(0).is_empty());
        assert!(doc.resolves(1, record.embedded_object_id));
    }

    #[test]
    fn delete_all_removes_only_tracked_stickers() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();
        assert_eq!(doc.image_resource_count(0), 1);

        let first = store
            .place(&mut doc, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");
        let second = store
            .place(&mut doc, 0, PdfRect::new(200.0, 200.0, 300.0, 300.0), sticker(), &text())
            .expect("placement should succeed");
        assert_eq!(doc.image_resource_count(0), 3);

        let report = store.delete_all(&mut doc, 0);

        assert_eq!(report, DeletionReport { removed: 2, ..DeletionReport::default() });
        assert_eq!(doc.image_resource_count(0), 1);
        assert!(doc.has_xobject(0, fixtures::SCAN_RESOURCE_NAME));
        assert!(!doc.resolves(0, first.embedded_object_id));
        assert!(!doc.resolves(0, second.embedded_object_id));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn delete_all_skips_stale_records() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();

        let doomed = store
            .place(&mut doc, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");
        store
            .place(&mut doc, 0, PdfRect::new(150.0, 0.0, 250.0, 100.0), sticker(), &text())
            .expect("placement should succeed");

        let doomed_id = (doomed.embedded_object_id.number, doomed.embedded_object_id.generation);
        doc.lopdf_mut().objects.remove(&doomed_id);

        let report = store.delete_all(&mut doc, 0);

        assert_eq!(report.removed, 1);
        assert_eq!(report.stale, vec![doomed.embedded_object_id]);
        assert_eq!(doc.image_resource_count(0), 1);
        assert!(store.records(0).is_empty());
    }

    #[test]
    fn delete_all_on_untouched_page_is_a_no_op() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();

        let report = store.delete_all(&mut doc, 1);

        assert_eq!(report, DeletionReport::default());
        assert_eq!(doc.image_resource_count(1), 1);
    }

    #[test]
    fn reconcile_drops_records_that_no_longer_resolve() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();
        let kept = store
            .place(&mut doc, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");
        let lost = store
            .place(&mut doc, 1, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");

        let lost_id = (lost.embedded_object_id.number, lost.embedded_object_id.generation);
        doc.lopdf_mut().objects.remove(&lost_id);

        assert_eq!(store.reconcile(&doc), vec![lost.embedded_object_id]);
        assert_eq!(store.all_records(), vec![kept]);
    }

    #[test]
    fn reconcile_drops_records_claiming_original_content() {
        let mut doc = scanned_document();
        let real = AnnotationStore::new()
            .place(&mut doc, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");
        let forged = forged_scan_record(&doc, 0);
        let mut store = AnnotationStore::from_records(vec![forged.clone(), real.clone()]);

        assert_eq!(store.reconcile(&doc), vec![forged.embedded_object_id]);
        assert_eq!(store.all_records(), vec![real]);
    }

    #[test]
    fn delete_all_never_removes_original_scan() {
        let mut doc = scanned_document();
        let forged = forged_scan_record(&doc, 0);
        let mut store = AnnotationStore::from_records(vec![forged.clone()]);

        let report = store.delete_all(&mut doc, 0);

        assert_eq!(report.removed, 0);
        assert_eq!(report.stale, vec![forged.embedded_object_id]);
        assert!(doc.has_xobject(0, fixtures::SCAN_RESOURCE_NAME));
        assert_eq!(doc.image_draws(0).expect("draws").len(), 1, "scan is still drawn");
        let page_id = doc.lopdf().get_pages()[&1];
        assert!(doc.lopdf().get_page_contents(page_id).contains(&forged.content_object_id.into()));
    }

    #[test]
    fn failed_removal_keeps_record_tracked() {
        let mut graph = ReadOnly(scanned_document());
        let mut store = AnnotationStore::new();
        let record = store
            .place(&mut graph, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");

        let report = store.delete_all(&mut graph, 0);

        assert_eq!(report.removed, 0);
        assert!(report.stale.is_empty());
        assert_eq!(report.failed, vec![record.embedded_object_id]);
        assert_eq!(store.records(0), &[record.clone()]);
        assert!(graph.owns(0, &EmbeddedSticker::from(&record)));
    }

    #[test]
    fn record_at_prefers_latest_overlapping_sticker() {
        let mut doc = PdfDocument::open_bytes(&fixtures::sample_pdf(&[PageSize::default()]))
            .expect("fixture should open");
        let mut store = AnnotationStore::new();
        store
            .place(&mut doc, 0, PdfRect::new(0.0, 0.0, 100.0, 100.0), sticker(), &text())
            .expect("placement should succeed");
        let top = store
            .place(&mut doc, 0, PdfRect::new(50.0, 50.0, 150.0, 150.0), sticker(), &text())
            .expect("placement should succeed");

        let hit = store.record_at(0, PdfPoint::new(75.0, 75.0)).expect("a sticker is hit");
        assert_eq!(hit.embedded_object_id, top.embedded_object_id);
        assert!(store.record_at(0, PdfPoint::new(400.0, 400.0)).is_none());
        assert!(store.is_tracked(top.embedded_object_id));
    }

    #[test]
    fn place_on_missing_page_fails_without_tracking() {
        let mut doc = scanned_document();
        let mut store = AnnotationStore::new();

        let result = store.place(&mut doc, 9, PdfRect::new(0.0, 0.0, 1.0, 1.0), sticker(), &text());

        assert!(matches!(result, Err(EngineError::PageOutOfRange { page: 9, page_count: 2 })));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn from_records_groups_by_page() {
        let record = |page_index: u32, number: u32| AnnotationRecord {
            embedded_object_id: ObjectRef::new(number, 0),
            content_object_id: ObjectRef::new(number + 1, 0),
            resource_name: format!("ExSt{number}"),
            page_index,
            rect: PdfRect::new(0.0, 0.0, 100.0, 100.0),
            top_text: String::new(),
            bottom_text: String::new(),
        };

        let store =
            AnnotationStore::from_records(vec![record(2, 10), record(0, 20), record(2, 30)]);

        assert_eq!(store.count(), 3);
        assert_eq!(store.records(2).len(), 2);
        let order: Vec<u32> =
            store.all_records().iter().map(|r| r.embedded_object_id.number).collect();
        assert_eq!(order, vec![20, 10, 30]);
    }
}
