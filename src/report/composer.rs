use std::mem;

use log::debug;

use crate::error::LayoutError;
use crate::report::model::{
    BlockContent, Document, Margins, Page, PageSize, PlacedBlock, Rect, Section,
};

const DEFAULT_HEADING_HEIGHT: f32 = 20.0;
const DEFAULT_LINE_HEIGHT: f32 = 20.0;
const DEFAULT_IMAGE_GAP: f32 = 30.0;

/// Flows sections onto fixed-size pages.
///
/// Each section is placed as its heading, then its rows one line at a time,
/// then its optional image. A block is committed only where it fits whole
/// between the cursor and the bottom margin; otherwise the current page is
/// finalized and the block starts the next one. Rows of one section may run
/// across pages but a heading is never left at the foot of a page without
/// room for at least one line after it.
///
/// The composer holds configuration only. All page and cursor state lives in
/// one `compose` call, so a single instance can serve several threads.
///
/// # Examples
///
/// ```
/// use ecommerce_batch::report::composer::ComposerBuilder;
/// use ecommerce_batch::report::model::{Margins, PageSize, Section};
///
/// let composer = ComposerBuilder::new().line_height(14.0).build();
/// let sections = vec![Section::new("Revenue").rows(["Lamp: $24.50", "Pen: $1.25"])];
///
/// let document = composer
///     .compose(&sections, PageSize::LETTER, Margins::uniform(40.0))
///     .unwrap();
///
/// assert_eq!(document.page_count(), 1);
/// assert_eq!(document.blocks().count(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composer {
    heading_height: f32,
    line_height: f32,
    image_gap: f32,
}

impl Default for Composer {
    fn default() -> Self {
        ComposerBuilder::new().build()
    }
}

impl Composer {
    /// Height of the block reserved for a section heading.
    pub fn heading_height(&self) -> f32 {
        self.heading_height
    }

    /// Height of the block reserved for one text row.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Space kept free below each image, clamped at the bottom margin.
    pub fn image_gap(&self) -> f32 {
        self.image_gap
    }

    /// Lays `sections` out in order on pages of `page_size`.
    ///
    /// # Errors
    /// - `LayoutError::InvalidPageGeometry` when the page cannot hold a
    ///   heading and one line between its margins.
    /// - `LayoutError::ImageTooLarge` when any image is taller than the
    ///   usable height of a fresh page.
    ///
    /// Both are checked before anything is placed.
    pub fn compose(
        &self,
        sections: &[Section],
        page_size: PageSize,
        margins: Margins,
    ) -> Result<Document, LayoutError> {
        let required = margins.top + margins.bottom + self.heading_height + self.line_height;
        if page_size.height <= required {
            return Err(LayoutError::InvalidPageGeometry {
                height: page_size.height,
                required,
            });
        }

        let usable = page_size.height - margins.top - margins.bottom;
        for section in sections {
            if let Some(image) = &section.image {
                if image.height > usable {
                    return Err(LayoutError::ImageTooLarge {
                        heading: section.heading.clone(),
                        height: image.height,
                        usable,
                    });
                }
            }
        }

        let mut state = CompositionState::new(page_size, margins);
        for section in sections {
            self.place_section(&mut state, section);
        }

        let document = state.finish();
        debug!(
            "Composed {} sections onto {} pages",
            sections.len(),
            document.page_count()
        );
        Ok(document)
    }

    fn place_section(&self, state: &mut CompositionState, section: &Section) {
        if section.force_page_break {
            state.break_page();
        }

        state.ensure_room(self.heading_height + self.line_height);
        state.place(
            BlockContent::Heading(section.heading.clone()),
            state.usable_width(),
            self.heading_height,
        );

        for row in &section.rows {
            state.ensure_room(self.line_height);
            state.place(
                BlockContent::TextLine(row.clone()),
                state.usable_width(),
                self.line_height,
            );
        }

        if let Some(image) = &section.image {
            let (width, height) = fit_width(image.width, image.height, state.usable_width());
            state.ensure_room(height + self.image_gap);
            state.place(BlockContent::Image(image.artifact.clone()), width, height);
            state.advance(self.image_gap);
        }
    }
}

/// Scales an image down proportionally when it is wider than `available`.
fn fit_width(width: f32, height: f32, available: f32) -> (f32, f32) {
    if width > available && available > 0.0 {
        (available, height * available / width)
    } else {
        (width, height)
    }
}

struct CompositionState {
    size: PageSize,
    margins: Margins,
    pages: Vec<Page>,
    page: Page,
    cursor: f32,
}

impl CompositionState {
    fn new(size: PageSize, margins: Margins) -> Self {
        Self {
            size,
            margins,
            pages: Vec::new(),
            page: Page::new(1, size),
            cursor: margins.top,
        }
    }

    fn bottom_limit(&self) -> f32 {
        self.size.height - self.margins.bottom
    }

    fn usable_width(&self) -> f32 {
        self.size.width - self.margins.left - self.margins.right
    }

    fn remaining(&self) -> f32 {
        self.bottom_limit() - self.cursor
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.remaining() < needed {
            self.break_page();
        }
    }

    /// Finalizes the current page. Does nothing while the page is empty, so
    /// blank pages are never emitted.
    fn break_page(&mut self) {
        if self.page.is_empty() {
            return;
        }

        let next = Page::new(self.page.number + 1, self.size);
        let finished = mem::replace(&mut self.page, next);
        debug!(
            "Page {} finalized with {} blocks",
            finished.number,
            finished.blocks.len()
        );
        self.pages.push(finished);
        self.cursor = self.margins.top;
    }

    fn place(&mut self, content: BlockContent, width: f32, height: f32) {
        let rect = Rect {
            x: self.margins.left,
            y: self.cursor,
            width,
            height,
        };
        self.page.blocks.push(PlacedBlock { content, rect });
        self.cursor += height;
    }

    /// Moves the cursor down without placing anything, never past the
    /// bottom margin.
    fn advance(&mut self, amount: f32) {
        self.cursor = (self.cursor + amount).min(self.bottom_limit());
    }

    fn finish(mut self) -> Document {
        if !self.page.is_empty() {
            self.pages.push(self.page);
        }
        Document::new(self.pages)
    }
}

/// Builder for [`Composer`]. Block heights default to 20 units and the gap
/// below an image to 30.
#[derive(Debug, Clone, Copy)]
pub struct ComposerBuilder {
    heading_height: f32,
    line_height: f32,
    image_gap: f32,
}

impl Default for ComposerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerBuilder {
    /// Creates a builder with the default heights and gap.
    pub fn new() -> Self {
        Self {
            heading_height: DEFAULT_HEADING_HEIGHT,
            line_height: DEFAULT_LINE_HEIGHT,
            image_gap: DEFAULT_IMAGE_GAP,
        }
    }

    /// Height of a heading block. Together with one line it sets the
    /// smallest usable page height the composer accepts.
    pub fn heading_height(mut self, height: f32) -> Self {
        self.heading_height = height;
        self
    }

    /// Height of a row block.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecommerce_batch::report::composer::ComposerBuilder;
    ///
    /// let composer = ComposerBuilder::new().heading_height(24.0).line_height(14.0).build();
    ///
    /// assert_eq!(composer.heading_height(), 24.0);
    /// assert_eq!(composer.line_height(), 14.0);
    /// assert_eq!(composer.image_gap(), 30.0);
    /// ```
    pub fn line_height(mut self, height: f32) -> Self {
        self.line_height = height;
        self
    }

    /// Vertical space left free below each image.
    pub fn image_gap(mut self, gap: f32) -> Self {
        self.image_gap = gap;
        self
    }

    /// Builds the composer.
    pub fn build(self) -> Composer {
        Composer {
            heading_height: self.heading_height,
            line_height: self.line_height,
            image_gap: self.image_gap,
        }
    }
}

/// Composes with the default block heights.
pub fn compose(
    sections: &[Section],
    page_size: PageSize,
    margins: Margins,
) -> Result<Document, LayoutError> {
    Composer::default().compose(sections, page_size, margins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{ImageRef, SectionImage};

    fn page() -> PageSize {
        PageSize::new(600.0, 800.0)
    }

    fn margins() -> Margins {
        Margins::uniform(40.0)
    }

    fn rows(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("row {}", i)).collect()
    }

    fn image(name: &str, width: f32, height: f32) -> SectionImage {
        SectionImage::new(ImageRef::new(name), width, height)
    }

    fn headings(page: &Page) -> Vec<&str> {
        page.blocks
            .iter()
            .filter_map(|block| match &block.content {
                BlockContent::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fifty_rows_flow_onto_a_second_page_without_repeating_the_heading() {
        let sections = vec![Section::new("Revenue").rows(rows(50))];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 2);
        let first = &document.pages()[0];
        let second = &document.pages()[1];
        assert_eq!(headings(first), vec!["Revenue"]);
        assert_eq!(first.blocks.len(), 36);
        assert_eq!(first.content_bottom(), 760.0);
        assert!(headings(second).is_empty());
        assert_eq!(second.blocks.len(), 15);
        assert_eq!(second.blocks[0].rect.y, 40.0);
        assert_eq!(
            second.blocks[0].content,
            BlockContent::TextLine("row 35".to_string())
        );
    }

    #[test]
    fn image_without_rows_sits_directly_below_heading() {
        let sections = vec![Section::new("Chart").image(image("chart.png", 500.0, 300.0))];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 1);
        let blocks = &document.pages()[0].blocks;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rect.y, 40.0);
        assert_eq!(blocks[1].rect.y, 60.0);
        assert_eq!(blocks[1].rect.height, 300.0);
        assert_eq!(
            blocks[1].content,
            BlockContent::Image(ImageRef::new("chart.png"))
        );
    }

    #[test]
    fn oversized_image_fails_before_placing_anything() {
        let sections = vec![
            Section::new("Fine").rows(rows(3)),
            Section::new("Too tall").image(image("tall.png", 500.0, 900.0)),
        ];

        let result = compose(&sections, page(), margins());

        assert_eq!(
            result,
            Err(LayoutError::ImageTooLarge {
                heading: "Too tall".to_string(),
                height: 900.0,
                usable: 720.0,
            })
        );
    }

    #[test]
    fn image_filling_the_usable_height_is_accepted() {
        let sections = vec![
            Section::new("Intro").rows(rows(2)),
            Section::new("Full page").image(image("full.png", 500.0, 720.0)),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        // the image needs its full height on a fresh page, so only its
        // heading stays with the intro
        assert_eq!(document.page_count(), 2);
        assert_eq!(headings(&document.pages()[0]), vec!["Intro", "Full page"]);
        let last = &document.pages()[1];
        assert_eq!(last.blocks.len(), 1);
        assert_eq!(last.blocks[0].rect.y, 40.0);
        assert_eq!(last.content_bottom(), 760.0);
    }

    #[test]
    fn page_too_small_for_heading_and_line_is_rejected() {
        let result = compose(&[], PageSize::new(600.0, 120.0), margins());

        assert_eq!(
            result,
            Err(LayoutError::InvalidPageGeometry {
                height: 120.0,
                required: 120.0,
            })
        );
        assert!(compose(&[], PageSize::new(600.0, 121.0), margins()).is_ok());
    }

    #[test]
    fn heading_without_room_for_a_line_moves_to_the_next_page() {
        // 34 rows leave the cursor at 740: room for one line, not for a
        // heading plus a line
        let sections = vec![
            Section::new("First").rows(rows(34)),
            Section::new("Second").row("only"),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 2);
        assert_eq!(headings(&document.pages()[1]), vec!["Second"]);
        assert_eq!(document.pages()[1].blocks[0].rect.y, 40.0);
    }

    #[test]
    fn heading_with_exactly_enough_room_stays() {
        // 33 rows leave exactly 40 units
        let sections = vec![
            Section::new("First").rows(rows(33)),
            Section::new("Second").row("only"),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 1);
        assert_eq!(document.pages()[0].content_bottom(), 760.0);
    }

    #[test]
    fn forced_break_starts_a_new_page_but_never_a_blank_one() {
        let sections = vec![
            Section::new("Opening").start_on_new_page(),
            Section::new("Summary").row("total"),
            Section::new("Top sellers").row("lamp").start_on_new_page(),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 2);
        assert_eq!(headings(&document.pages()[0]), vec!["Opening", "Summary"]);
        assert_eq!(headings(&document.pages()[1]), vec!["Top sellers"]);
        assert!(document.pages().iter().all(|page| !page.is_empty()));
    }

    #[test]
    fn image_that_does_not_fit_moves_to_a_new_page() {
        let sections = vec![
            Section::new("Rows").rows(rows(20)),
            Section::new("Chart").image(image("chart.png", 500.0, 300.0)),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        // cursor is at 480 after the second heading; 300 + 30 needs 330
        assert_eq!(document.page_count(), 2);
        let second = &document.pages()[1];
        assert_eq!(second.blocks.len(), 1);
        assert_eq!(second.blocks[0].rect.y, 40.0);
        assert_eq!(headings(&document.pages()[0]), vec!["Rows", "Chart"]);
    }

    #[test]
    fn image_taller_than_usable_height_minus_gap_gets_its_own_page() {
        let sections = vec![
            Section::new("Chart").image(image("chart.png", 500.0, 700.0)),
            Section::new("After").row("next"),
        ];

        let document = compose(&sections, page(), margins()).unwrap();

        assert_eq!(document.page_count(), 3);
        assert_eq!(headings(&document.pages()[0]), vec!["Chart"]);
        assert_eq!(document.pages()[1].blocks.len(), 1);
        assert_eq!(document.pages()[1].content_bottom(), 740.0);
        assert_eq!(headings(&document.pages()[2]), vec!["After"]);
    }

    #[test]
    fn wide_images_are_scaled_to_the_usable_width() {
        let sections = vec![Section::new("Pie").image(image("pie.png", 1040.0, 200.0))];

        let document = compose(&sections, page(), margins()).unwrap();

        let rect = document.pages()[0].blocks[1].rect;
        assert_eq!(rect.x, 40.0);
        assert_eq!(rect.width, 520.0);
        assert_eq!(rect.height, 100.0);
    }

    #[test]
    fn empty_section_list_gives_an_empty_document() {
        let document = compose(&[], page(), margins()).unwrap();

        assert_eq!(document.page_count(), 0);
    }

    #[test]
    fn custom_heights_are_used_for_placement() {
        let composer = ComposerBuilder::new()
            .heading_height(30.0)
            .line_height(10.0)
            .image_gap(0.0)
            .build();
        let sections = vec![Section::new("Dense").rows(rows(3))];

        let document = composer.compose(&sections, page(), margins()).unwrap();

        let ys: Vec<f32> = document.blocks().map(|block| block.rect.y).collect();
        assert_eq!(ys, vec![40.0, 70.0, 80.0, 90.0]);
        assert_eq!(composer.image_gap(), 0.0);
    }
}
