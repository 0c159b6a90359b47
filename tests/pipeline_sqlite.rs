#![cfg(feature = "rdbc-sqlite")]

pub mod common;

use std::{fs, path::Path};

use ecommerce_batch::{
    aggregate::Segment, config::PipelineConfig, core::step::StepStatus, item::rdbc::ConflictPolicy,
    pipeline, BatchError,
};
use sqlx::SqlitePool;

fn config(input: &Path, output: &Path) -> PipelineConfig {
    PipelineConfig {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        database_url: format!("sqlite://{}", output.join("ecommerce.db").display()),
        ..PipelineConfig::default()
    }
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_writes_every_artifact_and_persists_the_tables() {
    let input = common::input_dir();
    let output = tempfile::tempdir().unwrap();
    let config = config(input.path(), output.path());

    let outcome = pipeline::run(&config).unwrap();

    let names: Vec<&str> = outcome
        .execution
        .step_executions
        .iter()
        .map(|step| step.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "validate",
            "merge",
            "persist-customers",
            "persist-orders",
            "persist-products",
            "persist-sales",
            "report"
        ]
    );
    assert!(outcome
        .execution
        .step_executions
        .iter()
        .all(|step| step.status == StepStatus::Success));

    let findings = fs::read_to_string(&outcome.validation_report).unwrap();
    assert_eq!(
        findings.lines().collect::<Vec<_>>(),
        vec![
            "customers contains missing values in columns: email",
            "orders has no missing values.",
            "products has no missing values.",
            "sales has no missing values.",
            "Product price is valid.",
            "Sales quantity is valid.",
            "Customer IDs are unique.",
            "Product IDs are unique.",
            "Sale IDs are unique.",
        ]
    );

    let merged = fs::read_to_string(&outcome.merged_data).unwrap();
    let mut lines = merged.lines();
    assert_eq!(
        lines.next(),
        Some("order_id,customer_id,product_id,quantity,order_date,name,email,product_name,price")
    );
    assert_eq!(lines.count(), 5);
    assert_eq!(outcome.execution.step("merge").unwrap().write_count, 5);

    let report = &outcome.report;
    assert!(report.path.exists());
    assert!(fs::read(&report.path).unwrap().starts_with(b"%PDF-"));
    assert_eq!(report.page_count, 2);
    assert!((report.summary.total_revenue - 459.49).abs() < 1e-6);
    let top: Vec<&str> = report
        .summary
        .top_selling
        .iter()
        .map(|t| t.product_name.as_str())
        .collect();
    assert_eq!(top, vec!["Notebook", "Desk Lamp", "Monitor"]);
    let segments: Vec<(Segment, usize)> = report
        .summary
        .segments
        .iter()
        .map(|s| (s.segment, s.customer_count))
        .collect();
    assert_eq!(
        segments,
        vec![(Segment::High, 1), (Segment::Medium, 1), (Segment::Low, 2)]
    );
    for chart in [
        "revenue_by_product.png",
        "total_revenue.png",
        "total_revenue_by_date.png",
        "top_selling_products.png",
        "customer_segmentation_revenue_pie.png",
    ] {
        assert!(output.path().join(chart).exists(), "{} missing", chart);
    }

    let pool = SqlitePool::connect(&config.database_url).await.unwrap();
    assert_eq!(count(&pool, "customers").await, 4);
    assert_eq!(count(&pool, "orders").await, 5);
    assert_eq!(count(&pool, "products").await, 3);
    assert_eq!(count(&pool, "sales").await, 4);
    let email: Option<String> =
        sqlx::query_scalar("SELECT email FROM customers WHERE customer_id = 3")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(email, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerunning_updates_rows_instead_of_duplicating_them() {
    let input = common::input_dir();
    let output = tempfile::tempdir().unwrap();
    let config = config(input.path(), output.path());

    pipeline::run(&config).unwrap();
    fs::write(
        input.path().join("products.csv"),
        "product_id,product_name,price\n10,Desk Lamp,30\n11,Notebook,3.25\n12,Monitor,199.99\n13,Stapler,8\n",
    )
    .unwrap();
    pipeline::run(&config).unwrap();

    let pool = SqlitePool::connect(&config.database_url).await.unwrap();
    assert_eq!(count(&pool, "products").await, 4);
    assert_eq!(count(&pool, "customers").await, 4);
    let price: f64 = sqlx::query_scalar("SELECT price FROM products WHERE product_id = 10")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(price, 30.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn ignore_policy_keeps_stored_rows() {
    let input = common::input_dir();
    let output = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        conflict_policy: ConflictPolicy::Ignore,
        ..config(input.path(), output.path())
    };

    pipeline::run(&config).unwrap();
    fs::write(
        input.path().join("customers.csv"),
        "customer_id,name,email\n1,Ada King,ada@example.org\n2,Grace Hopper,grace@example.com\n3,Alan Turing,\n4,Edsger Dijkstra,edsger@example.com\n",
    )
    .unwrap();
    pipeline::run(&config).unwrap();

    let pool = SqlitePool::connect(&config.database_url).await.unwrap();
    let name: String = sqlx::query_scalar("SELECT name FROM customers WHERE customer_id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name, "Ada Lovelace");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_csv_stops_the_pipeline_before_any_output() {
    let input = common::input_dir();
    let output = tempfile::tempdir().unwrap();
    fs::write(
        input.path().join("orders.csv"),
        "order_id,customer_id,product_id,quantity,order_date\n100,1,12,5\n",
    )
    .unwrap();

    let result = pipeline::run(&config(input.path(), output.path()));

    assert!(matches!(result, Err(BatchError::Parse(_))));
    assert!(!output.path().join("validation_report.txt").exists());
    assert!(!output.path().join("merged_data.csv").exists());
    assert!(!output.path().join("summary_report_with_charts.pdf").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn table_missing_a_persisted_column_is_a_schema_error() {
    let input = common::input_dir();
    let output = tempfile::tempdir().unwrap();
    fs::write(
        input.path().join("customers.csv"),
        "customer_id,name\n1,Ada Lovelace\n2,Grace Hopper\n",
    )
    .unwrap();

    let result = pipeline::run(&config(input.path(), output.path()));

    assert!(matches!(result, Err(BatchError::Schema(_))));
    assert!(!output.path().join("summary_report_with_charts.pdf").exists());
}
