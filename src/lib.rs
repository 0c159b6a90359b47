#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # E-commerce batch

 A batch pipeline over four e-commerce CSV extracts (customers, orders,
 products and sales). One run of the pipeline job:

 1. loads the four files into in-memory [`table::Table`]s,
 2. writes a plain-text validation report,
 3. joins orders with customers and products and writes the merged CSV,
 4. upserts every table into SQLite or MySQL,
 5. aggregates revenue, draws five PNG charts and publishes a paginated
    PDF summary report.

 Each stage is a [`core::step::Step`] of a single [`core::job::Job`]; the
 first failing step stops the job.

 ## Features

 | **Feature**   | **Description**                                     |
 |---------------|-----------------------------------------------------|
 | rdbc-sqlite   | Upsert writers for SQLite (enabled by default)      |
 | rdbc-mysql    | Upsert writers for MySQL                            |
 | full          | Enable all features                                 |

 ## Getting Started

 ```no_run
 use ecommerce_batch::{config::PipelineConfig, pipeline};

 #[tokio::main(flavor = "multi_thread")]
 async fn main() -> Result<(), ecommerce_batch::BatchError> {
     let config = PipelineConfig {
         input_dir: "data".into(),
         output_dir: "out".into(),
         database_url: "sqlite://out/ecommerce.db".to_string(),
         ..PipelineConfig::default()
     };

     let outcome = pipeline::run(&config)?;
     println!("{} pages written to {}", outcome.report.page_count, outcome.report.path.display());
     Ok(())
 }
 ```

 The page layout itself is independent of the pipeline and can be used on
 its own:

 ```
 use ecommerce_batch::report::{
     composer::ComposerBuilder,
     model::{Margins, PageSize, Section},
 };

 let sections = vec![Section::new("Summary Report").row("Total Revenue: $1,250.00")];
 let document = ComposerBuilder::new()
     .build()
     .compose(&sections, PageSize::LETTER, Margins::uniform(36.0))
     .unwrap();

 assert_eq!(document.page_count(), 1);
 ```
*/

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers and writers (CSV files, in-memory tables, databases)
pub mod item;

/// In-memory tables of dynamically typed cells
pub mod table;

pub mod dataset;

pub mod validation;

pub mod aggregate;

pub mod format;

/// PNG charts of the sales summary
pub mod chart;

pub mod report;

pub mod config;

pub mod pipeline;
