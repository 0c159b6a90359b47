use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Page dimensions in layout units (one unit is one PDF point).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, 8.5 x 11 inches.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}

/// Distances from each page edge that content never crosses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// The same margin on all four sides.
    pub fn uniform(margin: f32) -> Self {
        Self::new(margin, margin, margin, margin)
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(40.0)
    }
}

/// Handle on an image artifact produced by a collaborator.
///
/// The composer never opens the artifact, it only carries the handle through
/// to the placed block so the renderer can find it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// An image to place after a section's rows, with its requested size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionImage {
    /// Where the renderer reads the image from.
    pub artifact: ImageRef,
    /// Requested width; scaled down when wider than the usable width.
    pub width: f32,
    /// Requested height; must fit the usable height of an empty page.
    pub height: f32,
}

impl SectionImage {
    /// An image of the requested size.
    pub fn new(artifact: ImageRef, width: f32, height: f32) -> Self {
        Self {
            artifact,
            width,
            height,
        }
    }
}

/// A heading, its rows and an optional trailing image, placed as a unit.
///
/// # Examples
///
/// ```
/// use ecommerce_batch::report::model::{ImageRef, Section, SectionImage};
///
/// let section = Section::new("Top-Selling Products")
///     .row("Lamp: 12 units, $294.00")
///     .row("Pen: 9 units, $11.25")
///     .image(SectionImage::new(ImageRef::new("top.png"), 500.0, 200.0))
///     .start_on_new_page();
///
/// assert_eq!(section.rows.len(), 2);
/// assert!(section.force_page_break);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Title placed as the first block of the section.
    pub heading: String,
    /// One text line each, placed in order after the heading.
    pub rows: Vec<String>,
    /// Placed after the last row.
    pub image: Option<SectionImage>,
    /// Start the section on a fresh page unless the current one is empty.
    pub force_page_break: bool,
}

impl Section {
    /// A section with a heading, no rows, no image and no forced break.
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            rows: Vec::new(),
            image: None,
            force_page_break: false,
        }
    }

    /// Appends one row.
    pub fn row(mut self, row: impl Into<String>) -> Self {
        self.rows.push(row.into());
        self
    }

    /// Appends every row of `rows`, keeping their order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecommerce_batch::report::model::Section;
    ///
    /// let section = Section::new("Total Revenue by Product")
    ///     .row("Desk Lamp: $73.50")
    ///     .rows((1..=2).map(|i| format!("Product {}: $0.00", i)));
    ///
    /// assert_eq!(
    ///     section.rows,
    ///     vec!["Desk Lamp: $73.50", "Product 1: $0.00", "Product 2: $0.00"]
    /// );
    /// ```
    pub fn rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Sets the image placed after the rows, replacing any earlier one.
    pub fn image(mut self, image: SectionImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Requests a page break before the heading.
    pub fn start_on_new_page(mut self) -> Self {
        self.force_page_break = true;
        self
    }
}

/// Placement rectangle, `y` measured downward from the page top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// `y + height`.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// What a placed block shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BlockContent {
    /// A section heading.
    Heading(String),
    /// One row of a section.
    TextLine(String),
    /// A section image.
    Image(ImageRef),
}

/// A block committed to a page at its final position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedBlock {
    pub content: BlockContent,
    pub rect: Rect,
}

/// A finalized page. Numbers start at 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub size: PageSize,
    /// Blocks in placement order, top to bottom.
    pub blocks: Vec<PlacedBlock>,
}

impl Page {
    pub(crate) fn new(number: usize, size: PageSize) -> Self {
        Self {
            number,
            size,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Lowest edge of any block on the page, or 0 for an empty page.
    pub fn content_bottom(&self) -> f32 {
        self.blocks
            .iter()
            .map(|block| block.rect.bottom())
            .fold(0.0, f32::max)
    }
}

/// The composed document: finalized pages in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub(crate) fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every placed block, flattened across pages.
    pub fn blocks(&self) -> impl Iterator<Item = &PlacedBlock> {
        self.pages.iter().flat_map(|page| page.blocks.iter())
    }
}
