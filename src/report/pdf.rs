use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use encoding_rs::WINDOWS_1252;
use log::{debug, info};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat,
};

use crate::{
    report::model::{BlockContent, Document, Page, PlacedBlock},
    BatchError,
};

const HEADING_FONT: &str = "F1";
const BODY_FONT: &str = "F2";
const PRODUCER: &str = concat!("ecommerce-batch ", env!("CARGO_PKG_VERSION"));

/// Writes a composed [`Document`] as a PDF file.
///
/// Every composed page becomes one PDF page of the same size. Headings are
/// set in Helvetica-Bold and rows in Helvetica, both with WinAnsiEncoding so
/// Latin accents and the euro sign print as written; images are read from their
/// artifact path and embedded as RGB image objects, each file once however
/// often it is placed. Layout coordinates are measured from the page top, so
/// they are flipped to the bottom-left origin of PDF user space here.
///
/// # Examples
///
/// ```no_run
/// use ecommerce_batch::report::composer::compose;
/// use ecommerce_batch::report::model::{Margins, PageSize, Section};
/// use ecommerce_batch::report::pdf::PdfRendererBuilder;
///
/// let sections = vec![Section::new("Summary Report").row("Total Revenue: $1,003.00")];
/// let document = compose(&sections, PageSize::LETTER, Margins::default()).unwrap();
///
/// PdfRendererBuilder::new()
///     .title("Summary Report")
///     .build()
///     .render(&document, "summary_report_with_charts.pdf")
///     .unwrap();
/// ```
pub struct PdfRenderer {
    title: String,
    heading_font_size: f32,
    body_font_size: f32,
    compress: bool,
}

impl PdfRenderer {
    /// Writes `document` to `path`, replacing any existing file.
    ///
    /// # Errors
    /// `BatchError::Render` when an image cannot be read or decoded, or the
    /// file cannot be written.
    pub fn render<P: AsRef<Path>>(&self, document: &Document, path: P) -> Result<(), BatchError> {
        let path = path.as_ref();
        let mut pdf = PdfDocument::with_version("1.5");

        let pages_id = pdf.new_object_id();
        let heading_font = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let body_font = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut images: HashMap<PathBuf, ObjectId> = HashMap::new();
        let mut kids: Vec<Object> = Vec::with_capacity(document.page_count());

        for page in document.pages() {
            let mut xobjects = lopdf::Dictionary::new();
            let mut operations = Vec::new();

            for block in &page.blocks {
                match &block.content {
                    BlockContent::Heading(heading) => {
                        operations.extend(text_operations(
                            page,
                            block,
                            HEADING_FONT,
                            self.heading_font_size,
                            heading,
                        ));
                    }
                    BlockContent::TextLine(line) => {
                        operations.extend(text_operations(
                            page,
                            block,
                            BODY_FONT,
                            self.body_font_size,
                            line,
                        ));
                    }
                    BlockContent::Image(artifact) => {
                        let image_id = match images.get(artifact.path()) {
                            Some(id) => *id,
                            None => {
                                let id = embed_image(&mut pdf, artifact.path())?;
                                images.insert(artifact.path().to_path_buf(), id);
                                id
                            }
                        };
                        let name = format!("Im{}", image_id.0);
                        xobjects.set(name.as_bytes().to_vec(), image_id);
                        operations.extend(image_operations(page, block, &name));
                    }
                }
            }

            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| BatchError::Render(format!("page {}: {}", page.number, e)))?;
            let content_id = pdf.add_object(Stream::new(dictionary! {}, encoded));

            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    page.size.width.into(),
                    page.size.height.into(),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        HEADING_FONT => heading_font,
                        BODY_FONT => body_font,
                    },
                    "XObject" => xobjects,
                },
            });
            debug!(
                "Rendered page {} with {} blocks",
                page.number,
                page.blocks.len()
            );
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = pdf.add_object(dictionary! {
            "Title" => text_string(&self.title),
            "Producer" => Object::string_literal(PRODUCER),
        });
        pdf.trailer.set("Root", catalog_id);
        pdf.trailer.set("Info", info_id);

        if self.compress {
            pdf.compress();
        }
        pdf.save(path)
            .map_err(|e| BatchError::Render(format!("{}: {}", path.display(), e)))?;

        info!(
            "PDF report with {} pages written to {}",
            document.page_count(),
            path.display()
        );
        Ok(())
    }
}

/// Operations for a single line of text, baseline placed a little above the
/// bottom of its block.
fn text_operations(
    page: &Page,
    block: &PlacedBlock,
    font: &str,
    size: f32,
    text: &str,
) -> Vec<Operation> {
    let baseline =
        page.size.height - block.rect.bottom() + (block.rect.height - size) / 2.0 + 2.0;
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![block.rect.x.into(), baseline.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Encodes `text` for the WinAnsiEncoding of the standard fonts.
///
/// Characters outside Windows-1252 print as `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut utf8 = [0u8; 4];
    for ch in text.chars() {
        let (encoded, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut utf8));
        if unmappable || ch.is_control() {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&encoded);
        }
    }
    bytes
}

/// PDF text string for metadata: UTF-16BE with a byte order mark.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn image_operations(page: &Page, block: &PlacedBlock, name: &str) -> Vec<Operation> {
    let rect = block.rect;
    let y = page.size.height - rect.bottom();
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                rect.width.into(),
                0.into(),
                0.into(),
                rect.height.into(),
                rect.x.into(),
                y.into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn embed_image(pdf: &mut PdfDocument, path: &Path) -> Result<ObjectId, BatchError> {
    let decoded = image::open(path)
        .map_err(|e| BatchError::Render(format!("{}: {}", path.display(), e)))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        decoded.into_raw(),
    );
    debug!("Embedded {}x{} image {}", width, height, path.display());
    Ok(pdf.add_object(stream))
}

/// Builder for [`PdfRenderer`]. Defaults: title "Summary Report", 12 pt
/// headings, 10 pt rows, compressed streams.
pub struct PdfRendererBuilder {
    title: String,
    heading_font_size: f32,
    body_font_size: f32,
    compress: bool,
}

impl Default for PdfRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRendererBuilder {
    /// Creates a builder with the defaults.
    pub fn new() -> Self {
        Self {
            title: "Summary Report".to_string(),
            heading_font_size: 12.0,
            body_font_size: 10.0,
            compress: true,
        }
    }

    /// Document title stored in the PDF metadata.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Helvetica-Bold size, in points, of section headings.
    pub fn heading_font_size(mut self, size: f32) -> Self {
        self.heading_font_size = size;
        self
    }

    /// Helvetica size, in points, of section rows.
    pub fn body_font_size(mut self, size: f32) -> Self {
        self.body_font_size = size;
        self
    }

    /// Flate-compress content and image streams. On by default.
    pub fn compress(mut self, yes: bool) -> Self {
        self.compress = yes;
        self
    }

    /// Builds the renderer.
    pub fn build(self) -> PdfRenderer {
        PdfRenderer {
            title: self.title,
            heading_font_size: self.heading_font_size,
            body_font_size: self.body_font_size,
            compress: self.compress,
        }
    }
}
