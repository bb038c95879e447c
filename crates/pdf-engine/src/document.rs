use crate::graph::{EmbeddedSticker, PageGraph};
use crate::{EngineError, OpenError, WriteError};
use doc_model::{AnnotationRecord, ObjectRef, PageSize, PdfRect, StickerImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Catalog key holding the sticker registry.
const REGISTRY_KEY: &[u8] = b"ExhibitStickers";
const REGISTRY_VERSION: i64 = 1;

/// Page key marking pages whose original content has been wrapped in `q`/`Q`.
const ISOLATED_KEY: &[u8] = b"ExhibitIsolated";

const RESOURCE_PREFIX: &str = "ExSt";

/// Bytes searched for the `%PDF-` header.
const HEADER_WINDOW: usize = 1024;

/// Guards against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 32;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Whether the last `trailer` dictionary in `bytes` carries `/Encrypt`.
/// Only consulted when the file does not parse; sticker text elsewhere in the
/// file may legitimately contain the same bytes.
fn trailer_names_encrypt(bytes: &[u8]) -> bool {
    let Some(start) = bytes.windows(b"trailer".len()).rposition(|window| window == b"trailer")
    else {
        return false;
    };
    bytes[start..].windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt")
}

/// Page media box in PDF user space, normalized so `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MediaBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl MediaBox {
    const LETTER: MediaBox = MediaBox { x0: 0.0, y0: 0.0, x1: 612.0, y1: 792.0 };

    fn size(&self) -> PageSize {
        PageSize { width_pt: self.x1 - self.x0, height_pt: self.y1 - self.y0 }
    }

    /// Lower-left corner and extent of a page-space rect in user space.
    fn to_user_space(self, rect: PdfRect) -> (f32, f32, f32, f32) {
        (self.x0 + rect.x0, self.y1 - rect.y1, rect.width(), rect.height())
    }

    fn page_rect(self, x: f32, y: f32, width: f32, height: f32) -> PdfRect {
        let left = x - self.x0;
        let bottom = self.y1 - y;
        PdfRect::new(left, bottom - height, left + width, bottom)
    }
}

/// An open PDF plus the page table used to address it.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    inner: Document,
    pages: Vec<ObjectId>,
    source: Option<PathBuf>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(OpenError::NotFound(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut document = Self::open_bytes(&bytes)?;
        document.source = Some(path.to_path_buf());
        log::info!("opened {} ({} pages)", path.display(), document.page_count());
        Ok(document)
    }

    pub fn open_bytes(bytes: &[u8]) -> Result<Self, OpenError> {
        let header = &bytes[..bytes.len().min(HEADER_WINDOW)];
        if !header.windows(5).any(|window| window == b"%PDF-") {
            return Err(OpenError::NotAPdf);
        }

        let inner = match Document::load_mem(bytes) {
            Ok(inner) => inner,
            Err(_) if trailer_names_encrypt(bytes) => return Err(OpenError::Encrypted),
            Err(err) => return Err(OpenError::Corrupt(err.to_string())),
        };
        if inner.trailer.has(b"Encrypt") {
            return Err(OpenError::Encrypted);
        }

        let pages: Vec<ObjectId> = inner.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(OpenError::Corrupt("document has no pages".to_owned()));
        }

        Ok(Self { inner, pages, source: None })
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page_size(&self, page_index: u32) -> Result<PageSize, EngineError> {
        let page_id = self.page_id(page_index)?;
        Ok(self.media_box(page_id).size())
    }

    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.pages.iter().map(|page_id| self.media_box(*page_id).size()).collect()
    }

    /// Underlying lopdf document. Callers must not restructure the page tree.
    pub fn lopdf(&self) -> &Document {
        &self.inner
    }

    pub fn lopdf_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Whether the page's resources name an XObject `name`.
    pub fn has_xobject(&self, page_index: u32, name: &str) -> bool {
        self.page_id(page_index)
            .ok()
            .and_then(|page_id| self.page_xobjects(page_id))
            .is_some_and(|xobjects| xobjects.has(name.as_bytes()))
    }

    /// Sticker records persisted in the catalog. Malformed entries are
    /// skipped; callers reconcile the rest against the page graph.
    pub fn read_registry(&self) -> Vec<AnnotationRecord> {
        let Some(registry) = self.registry() else {
            return Vec::new();
        };

        let version = registry.get(b"Version").and_then(Object::as_i64).ok();
        if version != Some(REGISTRY_VERSION) {
            log::warn!("ignoring sticker registry with unsupported version {version:?}");
            return Vec::new();
        }

        let Some(entries) = registry
            .get(b"Records")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_array().ok())
        else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let record = self.parse_record(entry);
                if record.is_none() {
                    log::warn!("skipping malformed sticker registry entry");
                }
                record
            })
            .collect()
    }

    /// Serializes the document with `records` as its registry. The in-memory
    /// document is left untouched.
    pub fn to_bytes(&self, records: &[AnnotationRecord]) -> Result<Vec<u8>, WriteError> {
        let mut copy = self.inner.clone();
        write_registry(&mut copy, records)?;

        let mut bytes = Vec::new();
        copy.save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Writes to `dest` through a temporary file in the same directory, so a
    /// failed save never leaves a truncated PDF behind.
    pub fn save(&self, dest: &Path, records: &[AnnotationRecord]) -> Result<(), WriteError> {
        let bytes = self.to_bytes(records)?;
        let dir = dest
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(dest).map_err(|err| err.error)?;

        log::info!("saved {} ({} stickers)", dest.display(), records.len());
        Ok(())
    }

    /// Image XObjects drawn on the page, in paint order, with the page-space
    /// rect each one covers. Rotated or skewed draws are left out.
    pub(crate) fn image_draws(
        &self,
        page_index: u32,
    ) -> Result<Vec<(PdfRect, ObjectId)>, EngineError> {
        let page_id = self.page_id(page_index)?;
        let media_box = self.media_box(page_id);
        let xobjects = self.page_xobjects(page_id);

        let mut operations = Vec::new();
        for content_id in self.content_ids(page_id)? {
            operations.extend(self.decode_content(content_id)?.operations);
        }

        let mut stack = Vec::new();
        let mut ctm = IDENTITY;
        let mut draws = Vec::new();

        for operation in operations {
            match operation.operator.as_str() {
                "q" => stack.push(ctm),
                "Q" => ctm = stack.pop().unwrap_or(IDENTITY),
                "cm" => {
                    if let Some(matrix) = matrix_operands(&operation.operands) {
                        ctm = multiply(matrix, ctm);
                    }
                }
                "Do" => {
                    let Some(name) = operation.operands.first().and_then(|obj| obj.as_name().ok())
                    else {
                        continue;
                    };
                    let Some(Object::Reference(id)) =
                        xobjects.and_then(|xobjects| xobjects.get(name).ok())
                    else {
                        continue;
                    };
                    if !self.is_image(*id) || ctm[1] != 0.0 || ctm[2] != 0.0 {
                        continue;
                    }

                    let (x, width) = span(ctm[4], ctm[0]);
                    let (y, height) = span(ctm[5], ctm[3]);
                    draws.push((media_box.page_rect(x, y, width, height), *id));
                }
                _ => {}
            }
        }

        Ok(draws)
    }

    pub(crate) fn is_image(&self, id: ObjectId) -> bool {
        self.inner
            .get_object(id)
            .and_then(Object::as_stream)
            .and_then(|stream| stream.dict.get(b"Subtype").and_then(Object::as_name))
            .is_ok_and(|subtype| subtype == b"Image")
    }

    fn page_id(&self, page_index: u32) -> Result<ObjectId, EngineError> {
        self.pages.get(page_index as usize).copied().ok_or(EngineError::PageOutOfRange {
            page: page_index,
            page_count: self.page_count(),
        })
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.inner.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Looks `key` up on the page, then on its ancestors.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.inner.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = current.get(key) {
                return self.resolve(value);
            }
            let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.inner.get_dictionary(parent).ok()?;
        }
        None
    }

    fn media_box(&self, page_id: ObjectId) -> MediaBox {
        self.inherited(page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| {
                if array.len() != 4 {
                    return None;
                }
                let x0 = array[0].as_float().ok()?;
                let y0 = array[1].as_float().ok()?;
                let x1 = array[2].as_float().ok()?;
                let y1 = array[3].as_float().ok()?;
                Some(MediaBox { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) })
            })
            .filter(|media_box| media_box.x1 > media_box.x0 && media_box.y1 > media_box.y0)
            .unwrap_or(MediaBox::LETTER)
    }

    fn effective_resources(&self, page_id: ObjectId) -> Dictionary {
        self.inherited(page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new)
    }

    fn xobjects_in(&self, resources: &Dictionary) -> Dictionary {
        resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new)
    }

    fn page_xobjects(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let resources = self.inherited(page_id, b"Resources")?.as_dict().ok()?;
        self.resolve(resources.get(b"XObject").ok()?)?.as_dict().ok()
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, EngineError> {
        Ok(self.inner.get_object_mut(page_id).and_then(Object::as_dict_mut)?)
    }

    fn content_ids(&self, page_id: ObjectId) -> Result<Vec<ObjectId>, EngineError> {
        let page = self.inner.get_dictionary(page_id)?;
        let references = |items: &[Object]| {
            items.iter().filter_map(|item| item.as_reference().ok()).collect::<Vec<_>>()
        };

        match page.get(b"Contents") {
            Err(_) => Ok(Vec::new()),
            Ok(Object::Reference(id)) => match self.inner.get_object(*id)? {
                Object::Array(items) => Ok(references(items)),
                _ => Ok(vec![*id]),
            },
            Ok(Object::Array(items)) => Ok(references(items)),
            Ok(_) => Err(EngineError::MalformedPage {
                page: self.page_index_of(page_id),
                reason: "/Contents is neither a stream nor an array".to_owned(),
            }),
        }
    }

    fn set_contents(&mut self, page_id: ObjectId, ids: &[ObjectId]) -> Result<(), EngineError> {
        let contents: Vec<Object> = ids.iter().map(|id| Object::Reference(*id)).collect();
        self.page_dict_mut(page_id)?.set("Contents", contents);
        Ok(())
    }

    fn decode_content(&self, content_id: ObjectId) -> Result<Content, EngineError> {
        let stream = self.inner.get_object(content_id).and_then(Object::as_stream)?;
        let bytes = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
        Ok(Content::decode(&bytes)?)
    }

    fn page_index_of(&self, page_id: ObjectId) -> u32 {
        self.pages.iter().position(|id| *id == page_id).unwrap_or_default() as u32
    }

    fn add_image_stream(&mut self, image: &StickerImage) -> ObjectId {
        let (width, height) = (i64::from(image.width()), i64::from(image.height()));

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };

        if !image.is_opaque() {
            let mut smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                image.alpha_samples(),
            );
            if let Err(err) = smask.compress() {
                log::debug!("soft mask stored uncompressed: {err}");
            }
            dict.set("SMask", self.inner.add_object(smask));
        }

        let mut samples = Stream::new(dict, image.rgb_samples());
        if let Err(err) = samples.compress() {
            log::debug!("sticker samples stored uncompressed: {err}");
        }
        self.inner.add_object(samples)
    }

    /// Registers `image_id` under a fresh name in a page-local copy of the
    /// page's resources. Inherited or shared dictionaries are never edited.
    fn attach_xobject(
        &mut self,
        page_id: ObjectId,
        image_id: ObjectId,
    ) -> Result<String, EngineError> {
        let mut resources = self.effective_resources(page_id);
        let mut xobjects = self.xobjects_in(&resources);

        let name = (1u32..)
            .map(|n| format!("{RESOURCE_PREFIX}{n}"))
            .find(|name| !xobjects.has(name.as_bytes()))
            .unwrap_or_default();

        xobjects.set(name.clone(), Object::Reference(image_id));
        resources.set("XObject", Object::Dictionary(xobjects));
        self.page_dict_mut(page_id)?.set("Resources", Object::Dictionary(resources));
        Ok(name)
    }

    fn detach_xobject(&mut self, page_id: ObjectId, name: &str) -> Result<(), EngineError> {
        let mut resources = self.effective_resources(page_id);
        let mut xobjects = self.xobjects_in(&resources);
        xobjects.remove(name.as_bytes());

        resources.set("XObject", Object::Dictionary(xobjects));
        self.page_dict_mut(page_id)?.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Wraps the page's original content in `q`/`Q` once, so graphics state
    /// it leaves behind cannot leak into sticker drawing.
    fn isolate_original_content(&mut self, page_id: ObjectId) -> Result<(), EngineError> {
        if self.inner.get_dictionary(page_id)?.has(ISOLATED_KEY) {
            return Ok(());
        }

        let mut contents = self.content_ids(page_id)?;
        if !contents.is_empty() {
            let save = self.inner.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let restore = self.inner.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));
            contents.insert(0, save);
            contents.push(restore);
            self.set_contents(page_id, &contents)?;
        }

        self.page_dict_mut(page_id)?.set(ISOLATED_KEY, true);
        Ok(())
    }

    fn registry(&self) -> Option<&Dictionary> {
        let catalog_id = self.inner.trailer.get(b"Root").and_then(Object::as_reference).ok()?;
        let catalog = self.inner.get_dictionary(catalog_id).ok()?;
        self.resolve(catalog.get(REGISTRY_KEY).ok()?)?.as_dict().ok()
    }

    fn parse_record(&self, entry: &Object) -> Option<AnnotationRecord> {
        let dict = self.resolve(entry)?.as_dict().ok()?;
        let text = |key: &[u8]| {
            dict.get(key)
                .and_then(Object::as_str)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };

        let rect = dict.get(b"Rect").and_then(Object::as_array).ok()?;
        if rect.len() != 4 {
            return None;
        }
        let coords: Vec<f32> = rect.iter().filter_map(|value| value.as_float().ok()).collect();
        let [x0, y0, x1, y1] = coords.as_slice() else {
            return None;
        };

        let name = dict.get(b"Name").and_then(Object::as_name).ok()?;

        Some(AnnotationRecord {
            embedded_object_id: dict.get(b"Image").and_then(Object::as_reference).ok()?.into(),
            content_object_id: dict.get(b"Content").and_then(Object::as_reference).ok()?.into(),
            resource_name: String::from_utf8_lossy(name).into_owned(),
            page_index: u32::try_from(dict.get(b"Page").and_then(Object::as_i64).ok()?).ok()?,
            rect: PdfRect::new(*x0, *y0, *x1, *y1),
            top_text: text(b"Top".as_slice()),
            bottom_text: text(b"Bottom".as_slice()),
        })
    }
}

impl PageGraph for PdfDocument {
    fn page_count(&self) -> u32 {
        PdfDocument::page_count(self)
    }

    fn page_size(&self, page_index: u32) -> Result<PageSize, EngineError> {
        PdfDocument::page_size(self, page_index)
    }

    fn insert_image(
        &mut self,
        page_index: u32,
        rect: PdfRect,
        image: &StickerImage,
    ) -> Result<EmbeddedSticker, EngineError> {
        let page_id = self.page_id(page_index)?;

        let finite = rect.to_array().iter().all(|value| value.is_finite());
        if !finite || rect.width() <= 0.0 || rect.height() <= 0.0 {
            return Err(EngineError::InvalidRect(rect));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(EngineError::InvalidImage { width: image.width(), height: image.height() });
        }

        let media_box = self.media_box(page_id);
        self.isolate_original_content(page_id)?;

        let image_id = self.add_image_stream(image);
        let resource_name = self.attach_xobject(page_id, image_id)?;

        let (x, y, width, height) = media_box.to_user_space(rect);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(height),
                        Object::Real(x),
                        Object::Real(y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(resource_name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.inner.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut contents = self.content_ids(page_id)?;
        contents.push(content_id);
        self.set_contents(page_id, &contents)?;

        log::debug!(
            "page {}: /{resource_name} -> {} {} R, drawn by {} {} R",
            page_index + 1,
            image_id.0,
            image_id.1,
            content_id.0,
            content_id.1
        );

        Ok(EmbeddedSticker {
            image: image_id.into(),
            content: content_id.into(),
            resource_name,
        })
    }

    fn remove_image(
        &mut self,
        page_index: u32,
        embedded: &EmbeddedSticker,
    ) -> Result<(), EngineError> {
        let page_id = self.page_id(page_index)?;
        if !self.owns(page_index, embedded) {
            return Err(EngineError::StaleReference(embedded.image));
        }

        let image_id: ObjectId = embedded.image.into();
        let content_id: ObjectId = embedded.content.into();

        let contents: Vec<ObjectId> =
            self.content_ids(page_id)?.into_iter().filter(|id| *id != content_id).collect();
        self.detach_xobject(page_id, &embedded.resource_name)?;
        self.set_contents(page_id, &contents)?;

        self.inner.objects.remove(&content_id);
        if self.resolves(page_index, embedded.image) {
            log::debug!("image {} is still named elsewhere on the page, kept", embedded.image);
            return Ok(());
        }

        let smask = self
            .inner
            .get_object(image_id)
            .and_then(Object::as_stream)
            .and_then(|stream| stream.dict.get(b"SMask").and_then(Object::as_reference))
            .ok();

        self.inner.objects.remove(&image_id);
        if let Some(smask) = smask {
            self.inner.objects.remove(&smask);
        }

        Ok(())
    }

    fn resolves(&self, page_index: u32, image: ObjectRef) -> bool {
        let image_id: ObjectId = image.into();
        let Ok(page_id) = self.page_id(page_index) else {
            return false;
        };

        self.is_image(image_id)
            && self.page_xobjects(page_id).is_some_and(|xobjects| {
                xobjects
                    .iter()
                    .any(|(_, value)| matches!(value, Object::Reference(id) if *id == image_id))
            })
    }

    fn owns(&self, page_index: u32, embedded: &EmbeddedSticker) -> bool {
        let Ok(page_id) = self.page_id(page_index) else {
            return false;
        };
        let image_id: ObjectId = embedded.image.into();
        let content_id: ObjectId = embedded.content.into();
        let name = embedded.resource_name.as_str();

        let named = name.starts_with(RESOURCE_PREFIX)
            && self
                .page_xobjects(page_id)
                .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
                .is_some_and(|value| matches!(value, Object::Reference(id) if *id == image_id));
        if !named || !self.is_image(image_id) {
            return false;
        }

        self.content_ids(page_id).is_ok_and(|ids| ids.contains(&content_id))
            && self
                .decode_content(content_id)
                .is_ok_and(|content| draws_only(&content.operations, name))
    }

    fn placed_rect(&self, page_index: u32, embedded: &EmbeddedSticker) -> Option<PdfRect> {
        let page_id = self.page_id(page_index).ok()?;
        let content = self.decode_content(embedded.content.into()).ok()?;
        let matrix = content
            .operations
            .iter()
            .find(|operation| operation.operator == "cm")
            .and_then(|operation| matrix_operands(&operation.operands))?;

        let (x, width) = span(matrix[4], matrix[0]);
        let (y, height) = span(matrix[5], matrix[3]);
        Some(self.media_box(page_id).page_rect(x, y, width, height))
    }

    fn image_resource_count(&self, page_index: u32) -> usize {
        let Some(xobjects) = self.page_id(page_index).ok().and_then(|id| self.page_xobjects(id))
        else {
            return 0;
        };

        xobjects
            .iter()
            .filter(|(_, value)| matches!(value, Object::Reference(id) if self.is_image(*id)))
            .count()
    }
}

fn write_registry(
    document: &mut Document,
    records: &[AnnotationRecord],
) -> Result<(), lopdf::Error> {
    let catalog_id = document.trailer.get(b"Root").and_then(Object::as_reference)?;
    let entries: Vec<Object> = records.iter().map(record_object).collect();
    let catalog = document.get_object_mut(catalog_id).and_then(Object::as_dict_mut)?;

    if entries.is_empty() {
        catalog.remove(REGISTRY_KEY);
    } else {
        catalog.set(
            REGISTRY_KEY,
            dictionary! {
                "Version" => REGISTRY_VERSION,
                "Records" => entries,
            },
        );
    }

    Ok(())
}

fn record_object(record: &AnnotationRecord) -> Object {
    let rect: Vec<Object> =
        record.rect.to_array().iter().map(|value| Object::Real(*value)).collect();

    Object::Dictionary(dictionary! {
        "Image" => Object::Reference(record.embedded_object_id.into()),
        "Content" => Object::Reference(record.content_object_id.into()),
        "Name" => Object::Name(record.resource_name.as_bytes().to_vec()),
        "Page" => i64::from(record.page_index),
        "Rect" => rect,
        "Top" => Object::string_literal(record.top_text.as_str()),
        "Bottom" => Object::string_literal(record.bottom_text.as_str()),
    })
}

/// Whether `operations` are exactly `q <matrix> cm /name Do Q`.
fn draws_only(operations: &[Operation], name: &str) -> bool {
    let [save, transform, draw, restore] = operations else {
        return false;
    };

    let drawn = match draw.operands.as_slice() {
        [operand] => operand.as_name().is_ok_and(|drawn| drawn == name.as_bytes()),
        _ => false,
    };

    save.operator == "q"
        && save.operands.is_empty()
        && transform.operator == "cm"
        && matrix_operands(&transform.operands).is_some()
        && draw.operator == "Do"
        && drawn
        && restore.operator == "Q"
        && restore.operands.is_empty()
}

fn matrix_operands(operands: &[Object]) -> Option<[f32; 6]> {
    if operands.len() != 6 {
        return None;
    }
    let mut matrix = [0.0; 6];
    for (slot, operand) in matrix.iter_mut().zip(operands) {
        *slot = operand.as_float().ok()?;
    }
    Some(matrix)
}

/// `m` applied in the coordinate system of `ctm` (`m × ctm`).
fn multiply(m: [f32; 6], ctm: [f32; 6]) -> [f32; 6] {
    [
        m[0] * ctm[0] + m[1] * ctm[2],
        m[0] * ctm[1] + m[1] * ctm[3],
        m[2] * ctm[0] + m[3] * ctm[2],
        m[2] * ctm[1] + m[3] * ctm[3],
        m[4] * ctm[0] + m[5] * ctm[2] + ctm[4],
        m[4] * ctm[1] + m[5] * ctm[3] + ctm[5],
    ]
}

/// Start and length of the unit interval scaled by `scale` from `origin`.
fn span(origin: f32, scale: f32) -> (f32, f32) {
    if scale < 0.0 {
        (origin + scale, -scale)
    } else {
        (origin, scale)
    }
}
