use std::path::Path;

use log::info;

use crate::{item::csv::csv_reader::CsvTableReaderBuilder, table::Table, BatchError};

/// The four related datasets the pipeline works on.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub customers: Table,
    pub orders: Table,
    pub products: Table,
    pub sales: Table,
}

/// File names of the four datasets inside an input directory.
#[derive(Debug, Clone)]
pub struct DatasetFiles<'a> {
    pub customers: &'a str,
    pub orders: &'a str,
    pub products: &'a str,
    pub sales: &'a str,
}

impl Default for DatasetFiles<'_> {
    fn default() -> Self {
        Self {
            customers: "customers.csv",
            orders: "orders.csv",
            products: "products.csv",
            sales: "sales.csv",
        }
    }
}

impl Datasets {
    /// Loads all four datasets, each with its primary key declared.
    ///
    /// Loading stops at the first file that cannot be parsed, so nothing
    /// downstream ever sees a partial set of tables.
    pub fn load(dir: &Path, files: &DatasetFiles<'_>) -> Result<Self, BatchError> {
        let load = |name: &str, file: &str, key: &str| {
            let table = CsvTableReaderBuilder::new()
                .primary_key(key)
                .read_path(name, dir.join(file))?;
            info!("Loaded {} rows into {}", table.len(), name);
            Ok::<Table, BatchError>(table)
        };

        Ok(Self {
            customers: load("customers", files.customers, "customer_id")?,
            orders: load("orders", files.orders, "order_id")?,
            products: load("products", files.products, "product_id")?,
            sales: load("sales", files.sales, "sale_id")?,
        })
    }

    /// The datasets with their names, in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        [&self.customers, &self.orders, &self.products, &self.sales].into_iter()
    }
}
