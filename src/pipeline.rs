//! The end-to-end run: load, validate, merge, persist, report.
//!
//! Everything that can fail before any work is done (reading the four CSV
//! files, connecting to the database, checking each table against its
//! persistence schema) happens while the job is assembled. The job itself is
//! a fixed sequence of steps; the first failing step aborts it, so the report
//! is never composed from data that did not load.

use std::{fs, path::PathBuf};

use log::info;

use crate::{
    aggregate::{self, AggregatorBuilder},
    chart::ChartRendererBuilder,
    config::PipelineConfig,
    core::{
        item::{ItemWriter, PassThroughProcessor},
        job::{Job, JobBuilder, JobExecution},
        step::{ChunkOrientedStep, StepBuilder},
    },
    dataset::Datasets,
    item::{
        csv::csv_writer::CsvRowWriterBuilder,
        rdbc::{DatabasePool, TableSchema},
        table_reader::TableItemReader,
    },
    report::{
        composer::ComposerBuilder, pdf::PdfRendererBuilder, sections::ImagePlacement,
        ReportOutcome, ReportTaskletBuilder,
    },
    table::{Row, Table},
    validation::ValidationTasklet,
    BatchError,
};

/// Name of the job, as it appears in the logs.
pub const JOB_NAME: &str = "ecommerce-pipeline";

/// Files and figures produced by a successful run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub execution: JobExecution,
    pub validation_report: PathBuf,
    pub merged_data: PathBuf,
    pub report: ReportOutcome,
}

/// Runs the whole pipeline once.
///
/// Database writers drive `sqlx` by blocking on the ambient tokio runtime,
/// which therefore has to be a multi-thread runtime.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome, BatchError> {
    fs::create_dir_all(&config.output_dir)?;

    let datasets = Datasets::load(&config.input_dir, &config.dataset_files())?;
    let merged = aggregate::merge(&datasets)?;
    let pool = DatabasePool::connect(&config.database_url)?;

    let validation_report = config.output_dir.join(&config.validation_report_file);
    let validation = ValidationTasklet::new(&datasets, validation_report.clone());
    let validate_step = StepBuilder::new("validate").tasklet(&validation).build()?;

    let processor = PassThroughProcessor;

    let merged_data = config.output_dir.join(&config.merged_file);
    let merged_reader = TableItemReader::new(&merged);
    let merged_writer = CsvRowWriterBuilder::new()
        .headers(&merged.column_names())
        .from_path(&merged_data)?;
    let merge_step = StepBuilder::new("merge")
        .chunk::<Row, Row>(config.chunk_size)
        .reader(&merged_reader)
        .processor(&processor)
        .writer(&merged_writer)
        .build()?;

    let targets: Vec<(&Table, TableSchema)> = vec![
        (&datasets.customers, TableSchema::customers()),
        (&datasets.orders, TableSchema::orders()),
        (&datasets.products, TableSchema::products()),
        (&datasets.sales, TableSchema::sales()),
    ]
    .into_iter()
    .map(|(table, schema)| (table, schema.conflict_policy(config.conflict_policy)))
    .collect();

    let readers: Vec<TableItemReader> = targets
        .iter()
        .map(|(table, _)| TableItemReader::new(table))
        .collect();
    let writers: Vec<Box<dyn ItemWriter<Row> + '_>> = targets
        .iter()
        .map(|(table, schema)| pool.upsert_writer(schema, table, config.create_tables))
        .collect::<Result<_, _>>()?;
    let persist_steps: Vec<ChunkOrientedStep<Row, Row>> = targets
        .iter()
        .zip(readers.iter().zip(&writers))
        .map(|((_, schema), (reader, writer))| {
            StepBuilder::new(&format!("persist-{}", schema.table()))
                .chunk::<Row, Row>(config.chunk_size)
                .reader(reader)
                .processor(&processor)
                .writer(writer.as_ref())
                .build()
        })
        .collect::<Result<_, _>>()?;

    let report = ReportTaskletBuilder::new()
        .datasets(&datasets)
        .aggregator(
            AggregatorBuilder::new()
                .top_n(config.top_n)
                .thresholds(config.segments)
                .build(),
        )
        .charts(
            ChartRendererBuilder::new()
                .size(config.charts.width, config.charts.height)
                .build()?,
        )
        .composer(
            ComposerBuilder::new()
                .heading_height(config.layout.heading_height)
                .line_height(config.layout.line_height)
                .image_gap(config.layout.image_gap)
                .build(),
        )
        .renderer(
            PdfRendererBuilder::new()
                .heading_font_size(config.layout.heading_font_size)
                .body_font_size(config.layout.body_font_size)
                .build(),
        )
        .output_dir(config.output_dir.clone())
        .report_file(&config.report_file)
        .page(config.page, config.margins)
        .placement(ImagePlacement {
            width: config.charts.placed_width,
            height: config.charts.placed_height,
        })
        .build()?;
    let report_step = StepBuilder::new("report").tasklet(&report).build()?;

    let mut builder = JobBuilder::new()
        .name(JOB_NAME.to_string())
        .start(&validate_step)
        .next(&merge_step);
    for step in &persist_steps {
        builder = builder.next(step);
    }
    let job = builder.next(&report_step).build();

    let execution = job.run()?;
    let report = report
        .outcome()
        .ok_or_else(|| BatchError::Render("report step finished without a report".to_string()))?;

    info!(
        "Pipeline finished in {:?}: {} rows merged, {} report pages",
        execution.duration,
        merged.len(),
        report.page_count
    );

    Ok(PipelineOutcome {
        execution,
        validation_report,
        merged_data,
        report,
    })
}
