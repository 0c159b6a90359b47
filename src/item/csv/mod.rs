/// CSV support for loading and writing tables.
///
/// # Module Architecture
///
/// 1. **CsvTableReaderBuilder**: loads a whole CSV source into a typed
///    [`Table`](crate::table::Table), inferring column types from the data
///    (integers, floats, `YYYY-MM-DD` dates, text) or using declared ones.
///    Malformed input is reported as `BatchError::Parse`.
///
/// 2. **CsvRowWriter**: an `ItemWriter` of table rows, writing a header
///    record when opened and one record per row.
///
/// # Examples
///
/// ```
/// use ecommerce_batch::core::item::ItemWriter;
/// use ecommerce_batch::item::csv::csv_reader::CsvTableReaderBuilder;
/// use ecommerce_batch::item::csv::csv_writer::CsvRowWriterBuilder;
///
/// let customers = CsvTableReaderBuilder::new()
///     .read_reader("customers", "customer_id,name\n1,Ada\n2,Grace\n".as_bytes())
///     .unwrap();
///
/// let mut buffer = Vec::new();
/// {
///     let writer = CsvRowWriterBuilder::new()
///         .headers(&customers.column_names())
///         .from_writer(&mut buffer);
///     writer.open().unwrap();
///     writer.write(customers.rows()).unwrap();
///     writer.close().unwrap();
/// }
///
/// assert_eq!(String::from_utf8(buffer).unwrap(), "customer_id,name\n1,Ada\n2,Grace\n");
/// ```

/// A module providing facilities for loading CSV data into tables.
pub mod csv_reader;

/// A module providing facilities for writing table rows as CSV.
pub mod csv_writer;
