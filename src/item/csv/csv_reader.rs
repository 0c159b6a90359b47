use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use log::debug;
use std::{collections::HashMap, fs::File, io::Read, path::Path};

use crate::{
    error::BatchError,
    table::{Column, ColumnType, Row, Table, Value},
};

/// A builder for loading a whole CSV source into a typed [`Table`].
///
/// The first record is always the header row; it names the columns. Column
/// types are inferred from the data unless declared with
/// [`column_type`](Self::column_type).
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Terminator: CRLF (which also accepts plain `\n`)
/// - Trimming: all fields trimmed
/// - Strict parsing: every record must have as many fields as the header
///
/// # Examples
///
/// ```
/// use ecommerce_batch::item::csv::csv_reader::CsvTableReaderBuilder;
/// use ecommerce_batch::table::{ColumnType, Value};
///
/// let data = "\
/// product_id,product_name,price
/// 1,Desk Lamp,24.5
/// 2,Notebook,3
/// ";
///
/// let products = CsvTableReaderBuilder::new()
///     .primary_key("product_id")
///     .read_reader("products", data.as_bytes())
///     .unwrap();
///
/// assert_eq!(products.len(), 2);
/// assert_eq!(products.column("price").unwrap().column_type, ColumnType::Float);
/// assert_eq!(products.rows()[1].get(2), &Value::Float(3.0));
/// assert_eq!(products.primary_key(), Some("product_id"));
/// ```
pub struct CsvTableReaderBuilder {
    /// The delimiter character (default: comma ',')
    delimiter: u8,
    /// The line terminator (default: CRLF)
    terminator: Terminator,
    /// Whether surrounding whitespace is removed from fields
    trim: bool,
    /// Types that override inference, by column name
    declared_types: HashMap<String, ColumnType>,
    primary_key: Option<String>,
}

impl Default for CsvTableReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTableReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::CRLF,
            trim: true,
            declared_types: HashMap::new(),
            primary_key: None,
        }
    }

    /// Field delimiter, a comma by default.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Trim whitespace around headers and fields. On by default.
    pub fn trim(mut self, yes: bool) -> Self {
        self.trim = yes;
        self
    }

    /// Declares the type of a column instead of inferring it.
    pub fn column_type(mut self, column: &str, column_type: ColumnType) -> Self {
        self.declared_types.insert(column.to_string(), column_type);
        self
    }

    /// Declares the primary key; loading fails if the column is absent.
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(column.to_string());
        self
    }

    /// Loads the file at `path` into a table called `name`.
    ///
    /// # Errors
    /// `BatchError::Parse` when the file cannot be opened or is malformed.
    pub fn read_path<P: AsRef<Path>>(&self, name: &str, path: P) -> Result<Table, BatchError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| {
            BatchError::Parse(format!("cannot open {}: {}", path.display(), error))
        })?;

        debug!("Loading table {} from {}", name, path.display());

        self.read_reader(name, file)
    }

    /// Loads CSV data from any `Read` source into a table called `name`.
    ///
    /// # Errors
    /// `BatchError::Parse` on ragged records, invalid UTF-8, a missing header
    /// row or a declared primary key that is not a column.
    pub fn read_reader<R: Read>(&self, name: &str, rdr: R) -> Result<Table, BatchError> {
        let mut rdr = ReaderBuilder::new()
            .trim(if self.trim { Trim::All } else { Trim::None })
            .delimiter(self.delimiter)
            .terminator(self.terminator)
            .has_headers(true)
            .flexible(false) // Use strict parsing to catch formatting errors
            .from_reader(rdr);

        let parse_error = |error: csv::Error| BatchError::Parse(format!("{}: {}", name, error));

        let headers = rdr.headers().map_err(parse_error)?.clone();
        if headers.is_empty() {
            return Err(BatchError::Parse(format!("{}: no header row", name)));
        }

        let records = rdr
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()
            .map_err(parse_error)?;

        let columns: Vec<Column> = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let column_type = self.declared_types.get(header).copied().unwrap_or_else(|| {
                    ColumnType::infer(records.iter().map(|record| &record[index]))
                });
                Column::new(header, column_type)
            })
            .collect();

        let mut table = Table::new(name, columns);
        for record in &records {
            let values = record
                .iter()
                .zip(table.columns())
                .map(|(cell, column)| Value::parse(cell, column.column_type))
                .collect();
            table.push_row(Row::new(values))?;
        }

        match &self.primary_key {
            Some(key) => table
                .with_primary_key(key)
                .map_err(|error| BatchError::Parse(error.to_string())),
            None => Ok(table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_types_and_nulls() {
        let data = "sale_id, product_id ,quantity_sold,sale_date
        1,1,3,2025-01-02
        2,2,,2025-01-03";

        let sales = CsvTableReaderBuilder::new()
            .read_reader("sales", data.as_bytes())
            .unwrap();

        assert_eq!(
            sales.column_names(),
            vec!["sale_id", "product_id", "quantity_sold", "sale_date"]
        );
        assert_eq!(
            sales.column("sale_date").unwrap().column_type,
            ColumnType::Date
        );
        assert_eq!(
            sales.column("quantity_sold").unwrap().column_type,
            ColumnType::Integer
        );
        assert_eq!(sales.columns_with_missing_values(), vec!["quantity_sold"]);
    }

    #[test]
    fn declared_type_overrides_inference() {
        let data = "customer_id,name\n7,Ada\n";

        let customers = CsvTableReaderBuilder::new()
            .column_type("customer_id", ColumnType::Text)
            .read_reader("customers", data.as_bytes())
            .unwrap();

        assert_eq!(customers.rows()[0].get(0), &Value::Text("7".to_string()));
    }

    #[test]
    fn ragged_record_is_a_parse_error() {
        let data = "order_id,quantity\n1,2\n2\n";

        let result = CsvTableReaderBuilder::new().read_reader("orders", data.as_bytes());

        assert!(matches!(result, Err(BatchError::Parse(msg)) if msg.starts_with("orders")));
    }

    #[test]
    fn unknown_primary_key_is_a_parse_error() {
        let data = "order_id,quantity\n1,2\n";

        let result = CsvTableReaderBuilder::new()
            .primary_key("id")
            .read_reader("orders", data.as_bytes());

        assert!(matches!(result, Err(BatchError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let result = CsvTableReaderBuilder::new().read_path("products", "/nonexistent/products.csv");

        assert!(matches!(result, Err(BatchError::Parse(_))));
    }
}
