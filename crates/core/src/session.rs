//! Document session
//!
//! Ties one open PDF to its view state (current page, zoom, the raster on
//! screen) and to the stickers placed on it. All user input goes through
//! [`DocumentSession::dispatch`] or the matching direct methods.

use crate::events::InputEvent;
use doc_model::{
    AnnotationRecord, DisplayPoint, DisplaySize, DocumentId, Preferences, StickerText,
    STICKER_SIZE_PX,
};
use pdf_engine::{
    AnnotationStore, DeletionReport, EngineError, OpenError, PdfDocument, Raster, RenderFailure,
    RenderPipeline, WriteError,
};
use std::path::{Path, PathBuf};
use sticker::StickerComposer;
use viewer_core::{
    display_to_pdf, sticker_rect, MapError, RenderOutcome, RenderSequencer, RenderTicket,
    ZoomController, ZoomDirection,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Render(#[from] RenderFailure),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("page {0} is being re-rendered")]
    PageBusy(u32),
    #[error("sticker mode is not armed")]
    NotArmed,
}

/// Settings a session is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Rasterization density at zoom 1.0.
    pub base_dpi: f32,

    /// Text used by [`DocumentSession::arm_default_sticker`].
    pub default_text: StickerText,

    /// Scalable font tried first when composing stickers.
    pub font_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Preferences::default())
    }
}

impl From<&Preferences> for SessionConfig {
    fn from(preferences: &Preferences) -> Self {
        let base_dpi = if preferences.base_dpi.is_finite() && preferences.base_dpi > 0.0 {
            preferences.base_dpi
        } else {
            log::warn!("ignoring invalid base_dpi {}, using 300", preferences.base_dpi);
            300.0
        };

        Self {
            base_dpi,
            default_text: preferences.default_sticker_text(),
            font_path: preferences.font_path.clone(),
        }
    }
}

/// What a handled event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOutcome {
    /// The current page must be rasterized again.
    pub needs_render: bool,

    /// Sticker placed by a click, if any.
    pub placed: Option<AnnotationRecord>,
}

impl SessionOutcome {
    fn unchanged() -> Self {
        Self::default()
    }

    fn rerender_if(changed: bool) -> Self {
        Self { needs_render: changed, placed: None }
    }
}

#[derive(Debug)]
pub struct DocumentSession {
    /// Identifier within the owning workspace
    id: DocumentId,

    /// The PDF being annotated
    document: PdfDocument,

    /// Stickers placed on the document, per page
    store: AnnotationStore,

    zoom: ZoomController,

    /// Current page (0-based)
    current_page: u32,

    /// Text of the sticker the next click places; `None` when not armed
    pending_sticker: Option<StickerText>,

    /// Size of the raster currently shown for the current page
    displayed: Option<DisplaySize>,

    sequencer: RenderSequencer,
    composer: StickerComposer,
    base_dpi: f32,
    default_text: StickerText,

    /// Whether stickers changed since the last save
    dirty: bool,
}

impl DocumentSession {
    pub fn open(
        id: DocumentId,
        path: impl AsRef<Path>,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let document = PdfDocument::open(path)?;
        Ok(Self::from_document(id, document, config))
    }

    pub fn open_bytes(
        id: DocumentId,
        bytes: &[u8],
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let document = PdfDocument::open_bytes(bytes)?;
        Ok(Self::from_document(id, document, config))
    }

    /// Wraps an opened document, recovering stickers from its registry.
    pub fn from_document(id: DocumentId, document: PdfDocument, config: &SessionConfig) -> Self {
        let mut store = AnnotationStore::from_records(document.read_registry());
        let dropped = store.reconcile(&document);
        if !dropped.is_empty() {
            log::warn!("{id}: dropped {} stale sticker records", dropped.len());
        }
        if store.count() > 0 {
            log::info!("{id}: recovered {} stickers", store.count());
        }

        Self {
            id,
            document,
            store,
            zoom: ZoomController::new(),
            current_page: 0,
            pending_sticker: None,
            displayed: None,
            sequencer: RenderSequencer::new(),
            composer: StickerComposer::new(config.font_path.as_deref()),
            base_dpi: config.base_dpi,
            default_text: config.default_text.clone(),
            dirty: false,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn document(&self) -> &PdfDocument {
        &self.document
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn page_count(&self) -> u32 {
        self.document.page_count()
    }

    /// Current page, 0-based.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Current page, 1-based.
    pub fn current_page_number(&self) -> u32 {
        self.current_page + 1
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.zoom()
    }

    pub fn base_dpi(&self) -> f32 {
        self.base_dpi
    }

    pub fn effective_dpi(&self) -> f32 {
        self.zoom.effective_dpi(self.base_dpi)
    }

    pub fn displayed_size(&self) -> Option<DisplaySize> {
        self.displayed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        self.store.records(self.current_page)
    }

    /// Jumps to a 1-based page. Out-of-range numbers are ignored.
    pub fn goto_page(&mut self, page_number: u32) -> bool {
        if page_number == 0 || page_number > self.page_count() {
            log::debug!("{}: ignoring page {page_number} of {}", self.id, self.page_count());
            return false;
        }

        let index = page_number - 1;
        if index == self.current_page {
            return false;
        }

        self.current_page = index;
        self.displayed = None;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.goto_page(self.current_page_number() + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.current_page > 0 && self.goto_page(self.current_page)
    }

    pub fn zoom_step(&mut self, direction: ZoomDirection) -> bool {
        self.zoom.step(direction)
    }

    pub fn zoom_by(&mut self, factor: f32) -> bool {
        self.zoom.scale_by(factor)
    }

    /// Arms sticker mode; the next click places a sticker with this text.
    pub fn arm_sticker(&mut self, top: impl Into<String>, bottom: impl Into<String>) {
        self.pending_sticker = Some(StickerText::new(top, bottom));
    }

    pub fn arm_default_sticker(&mut self) {
        self.pending_sticker = Some(self.default_text.clone());
    }

    pub fn cancel_sticker(&mut self) {
        self.pending_sticker = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending_sticker.is_some()
    }

    pub fn pending_sticker(&self) -> Option<&StickerText> {
        self.pending_sticker.as_ref()
    }

    /// Places the armed sticker with its top-left corner under the click.
    ///
    /// Sticker mode is disarmed by the click whatever the outcome, a busy
    /// page included; a failed placement has to be armed again.
    pub fn handle_click(&mut self, x: f32, y: f32) -> Result<AnnotationRecord, SessionError> {
        let text = self.pending_sticker.take().ok_or(SessionError::NotArmed)?;
        self.ensure_idle()?;

        let displayed = self.displayed.ok_or(MapError::DegenerateViewport)?;
        let page_size = self.document.page_size(self.current_page)?;
        let origin = display_to_pdf(DisplayPoint::new(x, y), page_size, displayed)?;
        let rect = sticker_rect(origin, STICKER_SIZE_PX, STICKER_SIZE_PX);

        let image = self.composer.compose_text(&text);
        let record = self.store.place(&mut self.document, self.current_page, rect, image, &text)?;
        self.dirty = true;
        Ok(record)
    }

    /// Sticker under a display-space point on the current page.
    pub fn sticker_at(&self, x: f32, y: f32) -> Result<Option<&AnnotationRecord>, SessionError> {
        let displayed = self.displayed.ok_or(MapError::DegenerateViewport)?;
        let page_size = self.document.page_size(self.current_page)?;
        let point = display_to_pdf(DisplayPoint::new(x, y), page_size, displayed)?;
        Ok(self.store.record_at(self.current_page, point))
    }

    /// Removes every sticker this workspace placed on the current page.
    pub fn delete_stickers(&mut self) -> Result<DeletionReport, SessionError> {
        self.ensure_idle()?;

        let report = self.store.delete_all(&mut self.document, self.current_page);
        if report.removed > 0 {
            self.dirty = true;
        }
        Ok(report)
    }

    pub fn dispatch(&mut self, event: InputEvent) -> Result<SessionOutcome, SessionError> {
        match event {
            InputEvent::Click { x, y } => match self.handle_click(x, y) {
                Ok(record) => Ok(SessionOutcome { needs_render: true, placed: Some(record) }),
                Err(SessionError::NotArmed) => Ok(SessionOutcome::unchanged()),
                Err(err) => Err(err),
            },
            InputEvent::WheelZoom { direction } => {
                Ok(SessionOutcome::rerender_if(self.zoom_step(direction)))
            }
            InputEvent::PinchZoom { factor } => {
                Ok(SessionOutcome::rerender_if(self.zoom_by(factor)))
            }
            InputEvent::PageNavigate { page } => {
                Ok(SessionOutcome::rerender_if(self.goto_page(page)))
            }
            InputEvent::NextPage => Ok(SessionOutcome::rerender_if(self.next_page())),
            InputEvent::PrevPage => Ok(SessionOutcome::rerender_if(self.prev_page())),
        }
    }

    /// Starts a render of the current page at the current zoom.
    pub fn request_render(&mut self) -> RenderTicket {
        let ticket =
            self.sequencer.begin(self.current_page, self.zoom.zoom(), self.effective_dpi());
        log::debug!(
            "{}: render #{} page {} at {:.0} dpi",
            self.id,
            ticket.sequence,
            ticket.page_index + 1,
            ticket.effective_dpi
        );
        ticket
    }

    /// Accepts a finished raster. Rasters for superseded requests, or for a
    /// page that is no longer current, are reported stale and not shown.
    pub fn accept_render(&mut self, ticket: &RenderTicket, raster: &Raster) -> RenderOutcome {
        let outcome = self.sequencer.finish(ticket);
        if outcome == RenderOutcome::Stale || ticket.page_index != self.current_page {
            log::debug!("{}: discarding stale render #{}", self.id, ticket.sequence);
            return RenderOutcome::Stale;
        }

        self.displayed = Some(DisplaySize::new(raster.width as f32, raster.height as f32));
        RenderOutcome::Current
    }

    /// Releases the page after a failed render.
    pub fn abandon_render(&mut self, ticket: &RenderTicket) {
        self.sequencer.abandon(ticket);
    }

    /// Renders the current page synchronously and displays the result.
    pub fn render_current(
        &mut self,
        pipeline: &dyn RenderPipeline,
    ) -> Result<Raster, SessionError> {
        let ticket = self.request_render();

        match pipeline.render(&self.document, ticket.page_index, ticket.effective_dpi) {
            Ok(raster) => {
                self.accept_render(&ticket, &raster);
                Ok(raster)
            }
            Err(failure) => {
                log::warn!("{}: {failure}", self.id);
                self.abandon_render(&ticket);
                Err(failure.into())
            }
        }
    }

    /// Records the on-screen size of the current page when the caller scales
    /// the raster before showing it.
    pub fn set_displayed_size(&mut self, size: DisplaySize) {
        self.displayed = Some(size);
    }

    /// Writes the document with its stickers to `dest`. The session is left
    /// unchanged if the write fails.
    pub fn save(&mut self, dest: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let dest = dest.as_ref();
        self.document.save(dest, &self.store.all_records())?;
        self.dirty = false;
        Ok(dest.to_path_buf())
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.sequencer.is_in_flight(self.current_page) {
            return Err(SessionError::PageBusy(self.current_page));
        }
        Ok(())
    }
}
