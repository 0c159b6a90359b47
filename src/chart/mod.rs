//! PNG charts for the summary report.
//!
//! Charts are drawn on an [`RgbImage`] with `imageproc` primitives and
//! encoded with the `image` PNG encoder. Text is rasterized from the
//! embedded DejaVu Sans face through `rusttype`, the font backend of
//! `imageproc`'s text drawing.

use std::{
    f32::consts::PI,
    fs,
    path::{Path, PathBuf},
};

use image::{ImageEncoder, Rgb, RgbImage, codecs::png::PngEncoder};
use imageproc::{
    drawing::{
        draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
        draw_text_mut, text_size,
    },
    point::Point,
    rect::Rect,
};
use log::info;
use rusttype::{Font, Scale};

use crate::{
    aggregate::SalesSummary,
    format::{currency, percent, quantity},
    BatchError,
};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([64, 64, 64]);
const LABEL: Rgb<u8> = Rgb([32, 32, 32]);
const LINE: Rgb<u8> = Rgb([0, 128, 128]);
const SINGLE_BAR: Rgb<u8> = Rgb([240, 128, 128]);

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([246, 112, 136]),
    Rgb([206, 143, 49]),
    Rgb([150, 163, 49]),
    Rgb([50, 177, 101]),
    Rgb([53, 172, 164]),
    Rgb([56, 168, 197]),
    Rgb([163, 140, 244]),
    Rgb([245, 101, 204]),
];

const PADDING: u32 = 30;
const LABEL_GAP: u32 = 6;
/// Pixel heights of chart titles and of every other label.
const TITLE_SIZE: f32 = 22.0;
const LABEL_SIZE: f32 = 14.0;
/// Height reserved above the plot for the title.
const TITLE_BAND: u32 = PADDING / 2 + TITLE_SIZE as u32 + 2 * LABEL_GAP;

/// A chart written to disk, with its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// File names of the five report charts.
pub const REVENUE_BY_PRODUCT: &str = "revenue_by_product.png";
pub const TOTAL_REVENUE: &str = "total_revenue.png";
pub const REVENUE_BY_DATE: &str = "total_revenue_by_date.png";
pub const TOP_SELLING: &str = "top_selling_products.png";
pub const SEGMENT_SHARE: &str = "customer_segmentation_revenue_pie.png";

/// The charts rendered for one summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub revenue_by_product: ImageArtifact,
    pub total_revenue: ImageArtifact,
    pub revenue_by_date: ImageArtifact,
    pub top_selling: ImageArtifact,
    pub segment_share: ImageArtifact,
}

/// Draws the report charts at a fixed pixel size.
///
/// Every chart has a title band at the top. Bars and points carry their
/// category name and a formatted value; pie slices carry their name and
/// their share of the total.
pub struct ChartRenderer {
    width: u32,
    height: u32,
    font: Font<'static>,
}

impl ChartRenderer {
    /// Renders all five charts into `output_dir`.
    pub fn render_summary(
        &self,
        summary: &SalesSummary,
        output_dir: &Path,
    ) -> Result<ChartSet, BatchError> {
        let revenue: Vec<(String, f64)> = summary
            .revenue_by_product
            .iter()
            .map(|p| (p.product_name.clone(), p.revenue))
            .collect();
        let by_date: Vec<(String, f64)> = summary
            .revenue_by_date
            .iter()
            .map(|d| (d.order_date.clone(), d.revenue))
            .collect();
        let sold: Vec<(String, f64)> = summary
            .top_selling
            .iter()
            .map(|t| (t.product_name.clone(), t.quantity_sold))
            .collect();
        let shares: Vec<(String, f64)> = summary
            .segments
            .iter()
            .map(|s| (s.segment.label().to_string(), s.revenue))
            .collect();

        Ok(ChartSet {
            revenue_by_product: self.horizontal_bars(
                &output_dir.join(REVENUE_BY_PRODUCT),
                "Total Revenue by Product",
                &revenue,
                |v| currency(v, 2),
            )?,
            total_revenue: self.single_bar(
                &output_dir.join(TOTAL_REVENUE),
                "Total Revenue",
                "Total Revenue",
                summary.total_revenue,
            )?,
            revenue_by_date: self.line(
                &output_dir.join(REVENUE_BY_DATE),
                "Total Revenue by Order Date",
                &by_date,
            )?,
            top_selling: self.horizontal_bars(
                &output_dir.join(TOP_SELLING),
                "Top-Selling Products by Quantity",
                &sold,
                quantity,
            )?,
            segment_share: self.pie(
                &output_dir.join(SEGMENT_SHARE),
                "Revenue Contribution by Customer Segment",
                &shares,
            )?,
        })
    }

    /// One bar per category, top to bottom.
    ///
    /// Category names are right-aligned in a column left of the axis, at
    /// most a third of the chart wide; values are printed at the bar ends.
    pub fn horizontal_bars(
        &self,
        path: &Path,
        title: &str,
        bars: &[(String, f64)],
        label: impl Fn(f64) -> String,
    ) -> Result<ImageArtifact, BatchError> {
        let mut image = self.canvas();
        let top = self.title(&mut image, title);
        let labels: Vec<String> = bars.iter().map(|(_, v)| label(*v)).collect();

        let name_room = bars
            .iter()
            .map(|(name, _)| self.text_width(name, LABEL_SIZE))
            .max()
            .unwrap_or(0)
            .min(self.width / 3)
            + LABEL_GAP;
        let value_room = labels
            .iter()
            .map(|l| self.text_width(l, LABEL_SIZE))
            .max()
            .unwrap_or(0)
            + LABEL_GAP;
        let left = PADDING + name_room;
        let plot_width = self
            .width
            .saturating_sub(left + PADDING + value_room)
            .max(1);
        let plot_height = self.height.saturating_sub(top + PADDING).max(1);
        let values: Vec<f64> = bars.iter().map(|(_, v)| *v).collect();
        let scale = scale_of(&values);

        if !bars.is_empty() {
            let band = plot_height as f32 / bars.len() as f32;
            for (i, ((name, value), text)) in bars.iter().zip(&labels).enumerate() {
                let length = ((value.max(0.0) / scale) as f32 * plot_width as f32).round() as u32;
                let bar_top = top as f32 + band * i as f32 + band * 0.2;
                let thickness = (band * 0.6).max(1.0) as u32;

                if length > 0 {
                    draw_filled_rect_mut(
                        &mut image,
                        Rect::at(left as i32, bar_top as i32).of_size(length, thickness),
                        PALETTE[i % PALETTE.len()],
                    );
                }

                let text_y = bar_top as i32 + (thickness as i32 - LABEL_SIZE as i32) / 2;
                let name_x = left as i32 - LABEL_GAP as i32 - self.text_width(name, LABEL_SIZE) as i32;
                self.text(&mut image, name_x.max(0), text_y, LABEL_SIZE, name);
                self.text(
                    &mut image,
                    (left + length + LABEL_GAP) as i32,
                    text_y,
                    LABEL_SIZE,
                    text,
                );
            }
        }

        draw_line_segment_mut(
            &mut image,
            (left as f32, top as f32),
            (left as f32, (top + plot_height) as f32),
            AXIS,
        );

        self.save(image, path)
    }

    /// One vertical bar named below the axis, with its value above it.
    pub fn single_bar(
        &self,
        path: &Path,
        title: &str,
        category: &str,
        value: f64,
    ) -> Result<ImageArtifact, BatchError> {
        let mut image = self.canvas();
        let top = self.title(&mut image, title);
        let text = currency(value, 2);

        let label_room = LABEL_SIZE as u32 + LABEL_GAP;
        let baseline = self.height.saturating_sub(PADDING + label_room);
        let plot_height = baseline.saturating_sub(top + label_room).max(1);
        let bar_width = (self.width / 3).max(1);
        let bar_left = (self.width - bar_width) / 2;
        let bar_height = if value > 0.0 { plot_height } else { 0 };

        if bar_height > 0 {
            draw_filled_rect_mut(
                &mut image,
                Rect::at(bar_left as i32, baseline.saturating_sub(bar_height) as i32)
                    .of_size(bar_width, bar_height),
                SINGLE_BAR,
            );
        }

        let value_y = baseline as i32 - bar_height as i32 - label_room as i32;
        self.centered_text(&mut image, self.width as f32 / 2.0, value_y, LABEL_SIZE, &text);
        self.centered_text(
            &mut image,
            self.width as f32 / 2.0,
            (baseline + LABEL_GAP) as i32,
            LABEL_SIZE,
            category,
        );

        draw_line_segment_mut(
            &mut image,
            (PADDING as f32, baseline as f32),
            ((self.width - PADDING) as f32, baseline as f32),
            AXIS,
        );

        self.save(image, path)
    }

    /// Points joined left to right, each marked and labelled with its value.
    ///
    /// Category names go below the axis. When they would overlap, only
    /// every n-th name is printed.
    pub fn line(
        &self,
        path: &Path,
        title: &str,
        points: &[(String, f64)],
    ) -> Result<ImageArtifact, BatchError> {
        let mut image = self.canvas();
        let top = self.title(&mut image, title);

        let label_room = LABEL_SIZE as u32 + LABEL_GAP;
        let widest = points
            .iter()
            .map(|(name, _)| self.text_width(name, LABEL_SIZE))
            .max()
            .unwrap_or(0);
        let inset = PADDING as f32 + widest as f32 / 2.0;
        let plot_width = (self.width as f32 - 2.0 * inset).max(1.0);
        let baseline = self.height.saturating_sub(PADDING + label_room) as f32;
        let plot_height = (baseline - (top + label_room) as f32).max(1.0);
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let scale = scale_of(&values);

        let step = if points.len() > 1 {
            plot_width / (points.len() - 1) as f32
        } else {
            0.0
        };
        let positions: Vec<(f32, f32)> = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let x = if points.len() > 1 {
                    inset + step * i as f32
                } else {
                    self.width as f32 / 2.0
                };
                let y = baseline - (value.max(0.0) / scale) as f32 * plot_height;
                (x, y)
            })
            .collect();
        let stride = if step > 0.0 {
            ((widest + LABEL_GAP) as f32 / step).ceil().max(1.0) as usize
        } else {
            1
        };

        draw_line_segment_mut(
            &mut image,
            (PADDING as f32, baseline),
            ((self.width - PADDING) as f32, baseline),
            AXIS,
        );
        for pair in positions.windows(2) {
            draw_line_segment_mut(&mut image, pair[0], pair[1], LINE);
        }
        for (i, ((x, y), (name, value))) in positions.iter().zip(points).enumerate() {
            draw_filled_circle_mut(&mut image, (*x as i32, *y as i32), 4, LINE);

            let text = currency(*value, 0);
            self.centered_text(&mut image, *x, *y as i32 - label_room as i32, LABEL_SIZE, &text);
            if i % stride == 0 {
                self.centered_text(
                    &mut image,
                    *x,
                    baseline as i32 + LABEL_GAP as i32,
                    LABEL_SIZE,
                    name,
                );
            }
        }

        self.save(image, path)
    }

    /// Slices proportional to the values, named outside the rim and
    /// labelled inside with their share.
    ///
    /// The first slice starts 140 degrees counter-clockwise from the x axis
    /// and slices follow counter-clockwise. Slices without revenue are left
    /// out.
    pub fn pie(
        &self,
        path: &Path,
        title: &str,
        slices: &[(String, f64)],
    ) -> Result<ImageArtifact, BatchError> {
        let mut image = self.canvas();
        self.title(&mut image, title);

        let total: f64 = slices.iter().map(|(_, v)| *v).filter(|v| *v > 0.0).sum();
        let (center, radius) = self.pie_frame();

        if total > 0.0 {
            let mut start = 140.0_f32.to_radians();
            for (i, (name, value)) in slices.iter().enumerate() {
                if *value <= 0.0 {
                    continue;
                }
                let share = value / total;
                let sweep = share as f32 * 2.0 * PI;
                let color = PALETTE[i % PALETTE.len()];

                if share >= 0.999 {
                    draw_filled_circle_mut(
                        &mut image,
                        (center.0 as i32, center.1 as i32),
                        radius as i32,
                        color,
                    );
                } else {
                    let polygon = sector(center, radius, start, sweep);
                    if polygon.len() >= 3 {
                        draw_polygon_mut(&mut image, &polygon, color);
                    }
                }

                let middle = start + sweep / 2.0;
                let half_line = LABEL_SIZE / 2.0;
                self.centered_text(
                    &mut image,
                    center.0 + radius * 0.6 * middle.cos(),
                    (center.1 - radius * 0.6 * middle.sin() - half_line) as i32,
                    LABEL_SIZE,
                    &percent(share),
                );

                let rim_x = center.0 + (radius + LABEL_GAP as f32) * middle.cos();
                let rim_y = center.1 - (radius + LABEL_GAP as f32) * middle.sin() - half_line;
                let name_x = if middle.cos() < 0.0 {
                    rim_x - self.text_width(name, LABEL_SIZE) as f32
                } else {
                    rim_x
                };
                self.text(&mut image, name_x as i32, rim_y as i32, LABEL_SIZE, name);

                start += sweep;
            }
        }

        self.save(image, path)
    }

    /// Center and radius of the pie, leaving a label line around the rim.
    fn pie_frame(&self) -> ((f32, f32), f32) {
        let plot_height = self.height.saturating_sub(TITLE_BAND) as f32;
        let center = (self.width as f32 / 2.0, TITLE_BAND as f32 + plot_height / 2.0);
        let radius = (self.width as f32).min(plot_height) / 2.0 - PADDING as f32 - LABEL_SIZE;
        (center, radius.max(1.0))
    }

    /// Draws `title` centered at the top and returns where the plot starts.
    fn title(&self, image: &mut RgbImage, title: &str) -> u32 {
        self.centered_text(
            image,
            self.width as f32 / 2.0,
            (PADDING / 2) as i32,
            TITLE_SIZE,
            title,
        );
        TITLE_BAND
    }

    fn text(&self, image: &mut RgbImage, x: i32, y: i32, size: f32, text: &str) {
        draw_text_mut(image, LABEL, x, y, Scale::uniform(size), &self.font, text);
    }

    fn centered_text(&self, image: &mut RgbImage, center_x: f32, y: i32, size: f32, text: &str) {
        let x = center_x - self.text_width(text, size) as f32 / 2.0;
        self.text(image, x as i32, y, size, text);
    }

    fn text_width(&self, text: &str, size: f32) -> u32 {
        let (width, _) = text_size(Scale::uniform(size), &self.font, text);
        width.max(0) as u32
    }

    fn canvas(&self) -> RgbImage {
        RgbImage::from_pixel(self.width, self.height, BACKGROUND)
    }

    fn save(&self, image: RgbImage, path: &Path) -> Result<ImageArtifact, BatchError> {
        let (width, height) = image.dimensions();

        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(&image.into_raw(), width, height, image::ColorType::Rgb8)
            .map_err(|e| BatchError::Chart(format!("{}: {}", path.display(), e)))?;
        fs::write(path, buffer)?;

        info!("Chart written to {}", path.display());
        Ok(ImageArtifact {
            path: path.to_path_buf(),
            width,
            height,
        })
    }
}

/// Largest value, or 1 when nothing is positive.
fn scale_of(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 { max } else { 1.0 }
}

/// Polygon approximating a pie slice, screen coordinates (y down).
fn sector(center: (f32, f32), radius: f32, start: f32, sweep: f32) -> Vec<Point<i32>> {
    let steps = ((sweep / (2.0 * PI)) * 90.0).ceil().max(1.0) as usize;
    let mut points = vec![Point::new(center.0.round() as i32, center.1.round() as i32)];

    for step in 0..=steps {
        let angle = start + sweep * step as f32 / steps as f32;
        let point = Point::new(
            (center.0 + radius * angle.cos()).round() as i32,
            (center.1 - radius * angle.sin()).round() as i32,
        );
        if points.last() != Some(&point) {
            points.push(point);
        }
    }

    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Builder for [`ChartRenderer`].
///
/// # Examples
///
/// ```
/// use ecommerce_batch::chart::ChartRendererBuilder;
///
/// let renderer = ChartRendererBuilder::new().size(640, 480).build().unwrap();
/// # let _ = renderer;
/// ```
pub struct ChartRendererBuilder {
    width: u32,
    height: u32,
}

impl Default for ChartRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartRendererBuilder {
    /// Creates a builder for 800 x 600 charts.
    pub fn new() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }

    /// Pixel size of every chart. Defaults to 800 x 600.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Loads the embedded font and checks the canvas leaves room to plot.
    ///
    /// # Errors
    /// `BatchError::Configuration` when the canvas is smaller than the
    /// padding plus title band, or the font cannot be parsed.
    pub fn build(self) -> Result<ChartRenderer, BatchError> {
        let min_width = 2 * PADDING + 1;
        let min_height = 2 * PADDING + TITLE_BAND + 1;
        if self.width < min_width || self.height < min_height {
            return Err(BatchError::Configuration(format!(
                "chart size {}x{} is below the {}x{} minimum",
                self.width, self.height, min_width, min_height
            )));
        }

        let font = Font::try_from_bytes(FONT_DATA).ok_or_else(|| {
            BatchError::Configuration("embedded chart font cannot be parsed".to_string())
        })?;

        Ok(ChartRenderer {
            width: self.width,
            height: self.height,
            font,
        })
    }
}
