//! Structural checks on the loaded datasets.
//!
//! The checks never fail the pipeline by themselves: each produces a
//! human-readable finding, and the ordered list of findings is logged and
//! written to a text report.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use log::info;

use crate::{
    core::step::{RepeatStatus, StepExecution, Tasklet},
    dataset::Datasets,
    table::Table,
    BatchError,
};

/// Runs every check and returns the findings in report order.
pub fn validate(datasets: &Datasets) -> Vec<String> {
    let mut findings: Vec<String> = datasets.iter().map(missing_values).collect();

    findings.push(numeric_check(
        &datasets.products,
        "price",
        "Product price must be numeric.",
        "Product price is valid.",
    ));
    findings.push(numeric_check(
        &datasets.sales,
        "quantity_sold",
        "Sales quantity must be numeric.",
        "Sales quantity is valid.",
    ));

    findings.push(duplicate_check(&datasets.customers, "customer_id", "customer", "Customer"));
    findings.push(duplicate_check(&datasets.products, "product_id", "product", "Product"));
    findings.push(duplicate_check(&datasets.sales, "sale_id", "sale", "Sale"));

    findings
}

fn missing_values(table: &Table) -> String {
    let columns = table.columns_with_missing_values();
    if columns.is_empty() {
        format!("{} has no missing values.", table.name())
    } else {
        format!(
            "{} contains missing values in columns: {}",
            table.name(),
            columns.join(", ")
        )
    }
}

fn missing_column(table: &Table, column: &str) -> String {
    format!("{} is missing column {}.", table.name(), column)
}

fn numeric_check(table: &Table, column: &str, invalid: &str, valid: &str) -> String {
    match table.column(column) {
        Some(c) if c.column_type.is_numeric() => valid.to_string(),
        Some(_) => invalid.to_string(),
        None => missing_column(table, column),
    }
}

fn duplicate_check(table: &Table, column: &str, noun: &str, title: &str) -> String {
    match table.has_duplicates(column) {
        Ok(true) => format!("Duplicate {} IDs found.", noun),
        Ok(false) => format!("{} IDs are unique.", title),
        Err(_) => missing_column(table, column),
    }
}

/// Tasklet validating the datasets and writing the findings file.
pub struct ValidationTasklet<'a> {
    datasets: &'a Datasets,
    report_path: PathBuf,
}

impl<'a> ValidationTasklet<'a> {
    pub fn new(datasets: &'a Datasets, report_path: PathBuf) -> Self {
        Self {
            datasets,
            report_path,
        }
    }
}

impl Tasklet for ValidationTasklet<'_> {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        let findings = validate(self.datasets);

        let mut report = BufWriter::new(File::create(&self.report_path)?);
        for finding in &findings {
            info!("{}", finding);
            writeln!(report, "{}", finding)?;
        }
        report.flush()?;

        info!(
            "Data validation report written to {}",
            self.report_path.display()
        );

        Ok(RepeatStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::csv::csv_reader::CsvTableReaderBuilder;

    fn load(name: &str, csv: &str) -> Table {
        CsvTableReaderBuilder::new()
            .read_reader(name, csv.as_bytes())
            .unwrap()
    }

    fn datasets(customers: &str, products: &str, sales: &str) -> Datasets {
        Datasets {
            customers: load("customers", customers),
            orders: load(
                "orders",
                "order_id,customer_id,product_id,quantity,order_date\n1,1,1,2,2025-01-01\n",
            ),
            products: load("products", products),
            sales: load("sales", sales),
        }
    }

    #[test]
    fn clean_datasets_produce_positive_findings() {
        let findings = validate(&datasets(
            "customer_id,name,email\n1,Ada,ada@example.com\n",
            "product_id,product_name,price\n1,Lamp,24.5\n",
            "sale_id,product_id,quantity_sold,sale_date\n1,1,3,2025-01-02\n",
        ));

        assert_eq!(
            findings,
            vec![
                "customers has no missing values.",
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
    }

    #[test]
    fn problems_are_reported_in_order() {
        let findings = validate(&datasets(
            "customer_id,name,email\n1,Ada,\n1,Grace,grace@example.com\n",
            "product_id,product_name,price\n1,Lamp,cheap\n",
            "sale_id,product_id,quantity_sold,sale_date\n1,1,3,2025-01-02\n1,1,,2025-01-03\n",
        ));

        assert_eq!(findings[0], "customers contains missing values in columns: email");
        assert_eq!(findings[3], "sales contains missing values in columns: quantity_sold");
        assert_eq!(findings[4], "Product price must be numeric.");
        assert_eq!(findings[5], "Sales quantity is valid.");
        assert_eq!(findings[6], "Duplicate customer IDs found.");
        assert_eq!(findings[8], "Duplicate sale IDs found.");
    }

    #[test]
    fn missing_columns_become_findings() {
        let findings = validate(&datasets(
            "id,name,email\n1,Ada,ada@example.com\n",
            "product_id,product_name\n1,Lamp\n",
            "sale_id,product_id,quantity_sold,sale_date\n1,1,3,2025-01-02\n",
        ));

        assert_eq!(findings[4], "products is missing column price.");
        assert_eq!(findings[6], "customers is missing column customer_id.");
    }

    #[test]
    fn tasklet_writes_one_finding_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation_report.txt");
        let data = datasets(
            "customer_id,name,email\n1,Ada,ada@example.com\n",
            "product_id,product_name,price\n1,Lamp,24.5\n",
            "sale_id,product_id,quantity_sold,sale_date\n1,1,3,2025-01-02\n",
        );

        let tasklet = ValidationTasklet::new(&data, path.clone());
        let status = tasklet.execute(&StepExecution::new("validate")).unwrap();

        assert_eq!(status, RepeatStatus::Finished);
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 9);
        assert!(content.starts_with("customers has no missing values.\n"));
    }
}
