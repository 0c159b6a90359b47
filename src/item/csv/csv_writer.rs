use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    path::Path,
    result,
};

use csv::{Writer, WriterBuilder};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    table::Row,
    BatchError,
};

/// Writes table rows as CSV records, header first.
///
/// The header row is written by `open`, so a step with no rows still
/// produces a file holding the column names.
pub struct CsvRowWriter<T: Write> {
    wrapper: RefCell<Writer<T>>,
    headers: Vec<String>,
}

impl<T: Write> ItemWriter<Row> for CsvRowWriter<T> {
    fn write(&self, items: &[Row]) -> ItemWriterResult {
        let mut wrapper = self.wrapper.borrow_mut();
        for row in items {
            wrapper
                .write_record(row.values().iter().map(|value| value.to_string()))
                .map_err(|error| BatchError::ItemWriter(error.to_string()))?;
        }
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    fn flush(&self) -> ItemWriterResult {
        self.wrapper
            .borrow_mut()
            .flush()
            .map_err(|error| BatchError::ItemWriter(error.to_string()))
    }

    fn open(&self) -> ItemWriterResult {
        if self.headers.is_empty() {
            return Ok(());
        }
        self.wrapper
            .borrow_mut()
            .write_record(&self.headers)
            .map_err(|error| BatchError::ItemWriter(error.to_string()))
    }

    fn close(&self) -> ItemWriterResult {
        ItemWriter::<Row>::flush(self)
    }
}

impl<T: Write> CsvRowWriter<T> {
    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> result::Result<T, BatchError> {
        self.wrapper
            .into_inner()
            .into_inner()
            .map_err(|error| BatchError::ItemWriter(error.to_string()))
    }
}

/// Builder for [`CsvRowWriter`]. Comma-delimited, no header row by default.
pub struct CsvRowWriterBuilder {
    delimiter: u8,
    headers: Vec<String>,
}

impl Default for CsvRowWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRowWriterBuilder {
    pub fn new() -> CsvRowWriterBuilder {
        CsvRowWriterBuilder {
            delimiter: b',',
            headers: Vec::new(),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvRowWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    /// Column names written as the first record. No header row when unset.
    pub fn headers<S: AsRef<str>>(mut self, headers: &[S]) -> CsvRowWriterBuilder {
        self.headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        self
    }

    /// Creates (or truncates) the file at `path`.
    pub fn from_path<R: AsRef<Path>>(self, path: R) -> Result<CsvRowWriter<File>, BatchError> {
        let wtr = WriterBuilder::new()
            .flexible(false)
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_path(path)
            .map_err(|error| BatchError::ItemWriter(error.to_string()))?;

        Ok(CsvRowWriter {
            wrapper: RefCell::new(wtr),
            headers: self.headers,
        })
    }

    pub fn from_writer<W: io::Write>(self, wtr: W) -> CsvRowWriter<W> {
        let wtr = WriterBuilder::new()
            .flexible(false)
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_writer(wtr);

        CsvRowWriter {
            wrapper: RefCell::new(wtr),
            headers: self.headers,
        }
    }
}
