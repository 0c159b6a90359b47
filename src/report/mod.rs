//! The summary report: sections laid out on pages and written as PDF.
//!
//! [`composer`] decides where every heading, row and chart goes; it knows
//! nothing about fonts or file formats. [`pdf`] turns the composed
//! [`model::Document`] into bytes. [`ReportTasklet`] runs the whole chain
//! from loaded datasets to the PDF file as one step of the pipeline job.

pub mod composer;
pub mod model;
pub mod pdf;
pub mod sections;

use std::{cell::RefCell, path::PathBuf};

use log::info;

use crate::{
    aggregate::{Aggregator, SalesSummary},
    chart::ChartRenderer,
    core::step::{RepeatStatus, StepExecution, Tasklet},
    dataset::Datasets,
    BatchError,
};

use composer::Composer;
use model::{Margins, PageSize};
use pdf::PdfRenderer;
use sections::{report_sections, ImagePlacement};

/// What a report run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    /// Figures the report was built from.
    pub summary: SalesSummary,
    /// Where the PDF was written.
    pub path: PathBuf,
    pub page_count: usize,
}

/// Aggregates, draws the charts, composes the pages and writes the PDF.
///
/// Charts are written next to the PDF. Any failure, including a layout
/// error, fails the step and no PDF is written.
pub struct ReportTasklet<'a> {
    datasets: &'a Datasets,
    aggregator: Aggregator,
    charts: ChartRenderer,
    composer: Composer,
    renderer: PdfRenderer,
    output_dir: PathBuf,
    report_file: String,
    page_size: PageSize,
    margins: Margins,
    placement: ImagePlacement,
    outcome: RefCell<Option<ReportOutcome>>,
}

impl ReportTasklet<'_> {
    /// Result of the last successful run.
    pub fn outcome(&self) -> Option<ReportOutcome> {
        self.outcome.borrow().clone()
    }
}

impl Tasklet for ReportTasklet<'_> {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        let summary = self.aggregator.summarize(self.datasets)?;
        let charts = self.charts.render_summary(&summary, &self.output_dir)?;

        let sections = report_sections(&summary, &charts, self.placement);
        let document = self
            .composer
            .compose(&sections, self.page_size, self.margins)?;

        let path = self.output_dir.join(&self.report_file);
        self.renderer.render(&document, &path)?;
        info!("PDF report generated: {}", path.display());

        *self.outcome.borrow_mut() = Some(ReportOutcome {
            summary,
            path,
            page_count: document.page_count(),
        });
        Ok(RepeatStatus::Finished)
    }
}

/// Builder for [`ReportTasklet`]. Only the datasets are required; every
/// collaborator falls back to its own builder's defaults, the report to
/// `summary_report_with_charts.pdf` in the current directory on US Letter
/// pages with 40 unit margins.
pub struct ReportTaskletBuilder<'a> {
    datasets: Option<&'a Datasets>,
    aggregator: Option<Aggregator>,
    charts: Option<ChartRenderer>,
    composer: Composer,
    renderer: Option<PdfRenderer>,
    output_dir: PathBuf,
    report_file: String,
    page_size: PageSize,
    margins: Margins,
    placement: ImagePlacement,
}

impl Default for ReportTaskletBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ReportTaskletBuilder<'a> {
    /// Creates a builder with the defaults and no datasets.
    pub fn new() -> Self {
        Self {
            datasets: None,
            aggregator: None,
            charts: None,
            composer: Composer::default(),
            renderer: None,
            output_dir: PathBuf::from("."),
            report_file: "summary_report_with_charts.pdf".to_string(),
            page_size: PageSize::default(),
            margins: Margins::default(),
            placement: ImagePlacement::default(),
        }
    }

    /// Tables the summary is computed from.
    pub fn datasets(mut self, datasets: &'a Datasets) -> Self {
        self.datasets = Some(datasets);
        self
    }

    /// Top-N and segmentation settings.
    pub fn aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Chart pixel size.
    pub fn charts(mut self, charts: ChartRenderer) -> Self {
        self.charts = Some(charts);
        self
    }

    /// Block heights and image gap used to lay the pages out.
    pub fn composer(mut self, composer: Composer) -> Self {
        self.composer = composer;
        self
    }

    /// Title, font sizes and compression of the PDF.
    pub fn renderer(mut self, renderer: PdfRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Directory receiving the charts and the PDF.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// File name of the PDF inside the output directory.
    pub fn report_file(mut self, report_file: &str) -> Self {
        self.report_file = report_file.to_string();
        self
    }

    /// Page size and margins the sections are composed on.
    pub fn page(mut self, page_size: PageSize, margins: Margins) -> Self {
        self.page_size = page_size;
        self.margins = margins;
        self
    }

    /// Size every chart is given in the document.
    pub fn placement(mut self, placement: ImagePlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Builds the tasklet.
    ///
    /// # Errors
    /// `BatchError::Configuration` without datasets, or when the default
    /// chart renderer cannot be created.
    pub fn build(self) -> Result<ReportTasklet<'a>, BatchError> {
        let datasets = self
            .datasets
            .ok_or_else(|| BatchError::Configuration("report has no datasets".to_string()))?;
        let charts = match self.charts {
            Some(charts) => charts,
            None => crate::chart::ChartRendererBuilder::new().build()?,
        };

        Ok(ReportTasklet {
            datasets,
            aggregator: self
                .aggregator
                .unwrap_or_else(|| crate::aggregate::AggregatorBuilder::new().build()),
            charts,
            composer: self.composer,
            renderer: self
                .renderer
                .unwrap_or_else(|| pdf::PdfRendererBuilder::new().build()),
            output_dir: self.output_dir,
            report_file: self.report_file,
            page_size: self.page_size,
            margins: self.margins,
            placement: self.placement,
            outcome: RefCell::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::csv::csv_reader::CsvTableReaderBuilder;
    use crate::table::Table;

    fn load(name: &str, csv: &str) -> Table {
        CsvTableReaderBuilder::new()
            .read_reader(name, csv.as_bytes())
            .unwrap()
    }

    fn datasets() -> Datasets {
        Datasets {
            customers: load("customers", "customer_id,name,email\n1,Ada,ada@example.com\n"),
            orders: load(
                "orders",
                "order_id,customer_id,product_id,quantity,order_date\n1,1,1,2,2025-01-01\n",
            ),
            products: load("products", "product_id,product_name,price\n1,Lamp,24.5\n"),
            sales: load(
                "sales",
                "sale_id,product_id,quantity_sold,sale_date\n1,1,3,2025-01-02\n",
            ),
        }
    }

    #[test]
    fn writes_pdf_and_charts_into_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = datasets();
        let tasklet = ReportTaskletBuilder::new()
            .datasets(&data)
            .output_dir(dir.path().to_path_buf())
            .build()
            .unwrap();

        let status = tasklet.execute(&StepExecution::new("report")).unwrap();

        assert_eq!(status, RepeatStatus::Finished);
        let outcome = tasklet.outcome().unwrap();
        assert_eq!(outcome.path, dir.path().join("summary_report_with_charts.pdf"));
        assert!(outcome.path.exists());
        assert!(dir.path().join("customer_segmentation_revenue_pie.png").exists());
        assert!(dir.path().join("total_revenue.png").exists());
        assert_eq!(outcome.summary.total_revenue, 73.5);
        // the top sellers section always opens a second page
        assert_eq!(outcome.page_count, 2);
    }

    #[test]
    fn layout_errors_fail_the_step_without_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let data = datasets();
        let tasklet = ReportTaskletBuilder::new()
            .datasets(&data)
            .output_dir(dir.path().to_path_buf())
            .placement(ImagePlacement {
                width: 500.0,
                height: 800.0,
            })
            .build()
            .unwrap();

        let result = tasklet.execute(&StepExecution::new("report"));

        assert!(matches!(result, Err(BatchError::Layout(_))));
        assert!(!dir.path().join("summary_report_with_charts.pdf").exists());
        assert!(tasklet.outcome().is_none());
    }

    #[test]
    fn builder_requires_datasets() {
        let result = ReportTaskletBuilder::new().build();

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }
}
