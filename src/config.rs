use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use serde::Deserialize;

use crate::{
    aggregate::SegmentThresholds,
    dataset::DatasetFiles,
    item::rdbc::ConflictPolicy,
    report::model::{Margins, PageSize},
    BatchError,
};

/// Settings of one pipeline run.
///
/// Every field has a default, so a configuration file only needs the values
/// it changes:
///
/// ```
/// use ecommerce_batch::config::PipelineConfig;
///
/// let config: PipelineConfig = serde_json::from_str(
///     r#"{ "input_dir": "data", "top_n": 3, "margins": { "top": 50, "bottom": 50, "left": 36, "right": 36 } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.top_n, 3);
/// assert_eq!(config.orders_file, "orders.csv");
/// assert_eq!(config.chunk_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub customers_file: String,
    pub orders_file: String,
    pub products_file: String,
    pub sales_file: String,
    /// Receives the validation report, merged CSV, charts and PDF.
    pub output_dir: PathBuf,
    pub database_url: String,
    pub create_tables: bool,
    pub conflict_policy: ConflictPolicy,
    pub chunk_size: u16,
    pub top_n: usize,
    pub segments: SegmentThresholds,
    pub validation_report_file: String,
    pub merged_file: String,
    pub report_file: String,
    pub page: PageSize,
    pub margins: Margins,
    pub layout: LayoutConfig,
    pub charts: ChartConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            customers_file: "customers.csv".to_string(),
            orders_file: "orders.csv".to_string(),
            products_file: "products.csv".to_string(),
            sales_file: "sales.csv".to_string(),
            output_dir: PathBuf::from("."),
            database_url: "sqlite://ecommerce.db".to_string(),
            create_tables: true,
            conflict_policy: ConflictPolicy::UpdateAll,
            chunk_size: 100,
            top_n: 5,
            segments: SegmentThresholds::default(),
            validation_report_file: "validation_report.txt".to_string(),
            merged_file: "merged_data.csv".to_string(),
            report_file: "summary_report_with_charts.pdf".to_string(),
            page: PageSize::LETTER,
            margins: Margins::default(),
            layout: LayoutConfig::default(),
            charts: ChartConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BatchError::Configuration(format!("cannot open {}: {}", path.display(), e))
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| BatchError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// File names of the four input datasets inside `input_dir`.
    pub fn dataset_files(&self) -> DatasetFiles<'_> {
        DatasetFiles {
            customers: &self.customers_file,
            orders: &self.orders_file,
            products: &self.products_file,
            sales: &self.sales_file,
        }
    }
}

/// Block heights and font sizes of the report, in points.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub heading_height: f32,
    pub line_height: f32,
    pub image_gap: f32,
    pub heading_font_size: f32,
    pub body_font_size: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            heading_height: 20.0,
            line_height: 20.0,
            image_gap: 30.0,
            heading_font_size: 12.0,
            body_font_size: 10.0,
        }
    }
}

/// Chart raster size in pixels and placed size in points.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub placed_width: f32,
    pub placed_height: f32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            placed_width: 500.0,
            placed_height: 200.0,
        }
    }
}
