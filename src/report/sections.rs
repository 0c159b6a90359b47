use crate::{
    aggregate::SalesSummary,
    chart::{ChartSet, ImageArtifact},
    format::{currency, quantity},
    report::model::{ImageRef, Section, SectionImage},
};

/// Size at which charts are placed on the page, in layout units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub width: f32,
    pub height: f32,
}

impl Default for ImagePlacement {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 200.0,
        }
    }
}

impl ImagePlacement {
    fn place(&self, artifact: &ImageArtifact) -> SectionImage {
        SectionImage::new(ImageRef::new(&artifact.path), self.width, self.height)
    }
}

/// The report sections in the order they are printed.
///
/// The top sellers always start a new page. The total revenue chart is
/// written to disk with the others but the summary only states the figure.
pub fn report_sections(
    summary: &SalesSummary,
    charts: &ChartSet,
    placement: ImagePlacement,
) -> Vec<Section> {
    vec![
        Section::new("Summary Report").row(format!(
            "Total Revenue: {}",
            currency(summary.total_revenue, 2)
        )),
        Section::new("Total Revenue by Product")
            .rows(
                summary
                    .revenue_by_product
                    .iter()
                    .map(|p| format!("{}: {}", p.product_name, currency(p.revenue, 2))),
            )
            .image(placement.place(&charts.revenue_by_product)),
        Section::new("Total Revenue by Order Date")
            .rows(
                summary
                    .revenue_by_date
                    .iter()
                    .map(|d| format!("{}: {}", d.order_date, currency(d.revenue, 2))),
            )
            .image(placement.place(&charts.revenue_by_date)),
        Section::new("Top-Selling Products")
            .rows(summary.top_selling.iter().map(|t| {
                format!(
                    "{}: {} units, {}",
                    t.product_name,
                    quantity(t.quantity_sold),
                    currency(t.revenue, 2)
                )
            }))
            .image(placement.place(&charts.top_selling))
            .start_on_new_page(),
        Section::new("Customer Segmentation")
            .rows(summary.segments.iter().map(|s| {
                format!(
                    "{}: {} customers, {}",
                    s.segment.label(),
                    s.customer_count,
                    currency(s.revenue, 2)
                )
            }))
            .image(placement.place(&charts.segment_share)),
    ]
}
