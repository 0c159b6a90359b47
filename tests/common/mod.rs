#![allow(dead_code)]

use std::{fs, path::Path};

use ecommerce_batch::report::model::{ImageRef, Section, SectionImage};
use tempfile::TempDir;

pub const DATASETS: [&str; 4] = ["customers.csv", "orders.csv", "products.csv", "sales.csv"];

/// Copies the fixture CSV files into a fresh temporary directory.
pub fn input_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Unable to create temp dir");
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data");
    for file in DATASETS {
        fs::copy(fixtures.join(file), dir.path().join(file)).expect("Unable to copy fixture");
    }
    dir
}

/// A section with `rows` numbered text rows and an optional image.
pub fn section(heading: &str, rows: usize, image_height: Option<f32>) -> Section {
    let section = Section::new(heading).rows((0..rows).map(|i| format!("{} row {}", heading, i)));
    match image_height {
        Some(height) => section.image(SectionImage::new(
            ImageRef::new(format!("{}.png", heading)),
            500.0,
            height,
        )),
        None => section,
    }
}
