//! Small PDFs built in memory for tests.
//!
//! Plain pages inherit a Helvetica font from the page tree and draw one line
//! of text. Scanned pages carry their own resources and additionally paint a
//! flat gray image over the whole media box, the way a scanner output does.

use doc_model::PageSize;
use lopdf::{dictionary, Document, Object, Stream};

/// Resource name of the full-page scan image.
pub const SCAN_RESOURCE_NAME: &str = "Im0";

/// Sample value of every scan pixel.
pub const SCAN_GRAY: u8 = 200;

const SCAN_SIDE_PX: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixturePage {
    pub media_box: [f32; 4],
    pub scanned: bool,
}

impl FixturePage {
    pub fn plain(size: PageSize) -> Self {
        Self { media_box: [0.0, 0.0, size.width_pt, size.height_pt], scanned: false }
    }

    pub fn scanned(size: PageSize) -> Self {
        Self { scanned: true, ..Self::plain(size) }
    }

    /// Moves the media box so its lower-left corner sits at (`x`, `y`).
    pub fn with_origin(mut self, x: f32, y: f32) -> Self {
        let [x0, y0, x1, y1] = self.media_box;
        self.media_box = [x, y, x + (x1 - x0), y + (y1 - y0)];
        self
    }
}

pub fn sample_pdf(pages: &[PageSize]) -> Vec<u8> {
    let pages: Vec<FixturePage> = pages.iter().copied().map(FixturePage::plain).collect();
    build(&pages)
}

pub fn scanned_pdf(page_count: usize) -> Vec<u8> {
    build(&vec![FixturePage::scanned(PageSize::default()); page_count])
}

pub fn build(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let [x0, y0, x1, y1] = page.media_box;
        let mut content =
            format!("BT /F1 18 Tf {} {} Td (Page {}) Tj ET\n", x0 + 72.0, y1 - 72.0, index + 1);

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Real(x0),
                Object::Real(y0),
                Object::Real(x1),
                Object::Real(y1),
            ],
        };

        if page.scanned {
            let scan_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(SCAN_SIDE_PX),
                    "Height" => i64::from(SCAN_SIDE_PX),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![SCAN_GRAY; (SCAN_SIDE_PX * SCAN_SIDE_PX) as usize],
            ));
            page_dict.set(
                "Resources",
                dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                    "XObject" => dictionary! { SCAN_RESOURCE_NAME => Object::Reference(scan_id) },
                },
            );
            content = format!(
                "q {} 0 0 {} {x0} {y0} cm /{SCAN_RESOURCE_NAME} Do Q\n{content}",
                x1 - x0,
                y1 - y0
            );
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        page_dict.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("in-memory fixture should serialize");
    bytes
}
