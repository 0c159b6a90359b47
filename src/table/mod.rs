//! Strongly typed, in-memory tables.
//!
//! Every dataset flowing through the pipeline is a [`Table`]: named, typed
//! columns, rows of [`Value`]s of matching arity and an optional declared
//! primary key. Tables are built and checked once at the ingestion boundary;
//! later stages look columns up by name and get a typed error instead of a
//! panic when a column is absent.

mod value;

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};

pub use value::{ColumnType, Value};

use crate::BatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

/// One table row. Its arity always matches the owning table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value at `index`, or `Value::Null` past the end of the row.
    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    primary_key: Option<String>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
            primary_key: None,
        }
    }

    /// Declares the primary key column. Fails when the column does not exist.
    pub fn with_primary_key(mut self, column: &str) -> Result<Self, BatchError> {
        self.require_column(column)?;
        self.primary_key = Some(column.to_string());
        Ok(self)
    }

    /// Appends a row.
    ///
    /// # Errors
    /// `BatchError::Schema` when the row's arity differs from the column count.
    pub fn push_row(&mut self, row: Row) -> Result<(), BatchError> {
        if row.len() != self.columns.len() {
            return Err(BatchError::Schema(format!(
                "row of {} values does not fit the {} columns of {}",
                row.len(),
                self.columns.len(),
                self.name
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Index of a column that must exist, as a `Schema` error otherwise.
    pub fn require_column(&self, name: &str) -> Result<usize, BatchError> {
        self.column_index(name).ok_or_else(|| {
            BatchError::Schema(format!("table {} has no column {}", self.name, name))
        })
    }

    /// Cells of one column, top to bottom.
    pub fn values<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a Value> + use<'a>, BatchError> {
        let index = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| row.get(index)))
    }

    /// Names of the columns holding at least one null, in column order.
    pub fn columns_with_missing_values(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(index, _)| self.rows.iter().any(|row| row.get(*index).is_null()))
            .map(|(_, column)| column.name.as_str())
            .collect()
    }

    /// Whether two non-null cells of the column share the same key.
    pub fn has_duplicates(&self, name: &str) -> Result<bool, BatchError> {
        let mut seen = HashSet::new();
        Ok(self
            .values(name)?
            .filter_map(Value::key)
            .any(|key| !seen.insert(key)))
    }

    /// Left join on a column present in both tables.
    ///
    /// Every row of `self` is kept, in order. A left row matching several
    /// rows of `right` is repeated once per match, in `right`'s order; an
    /// unmatched row is kept once with nulls. Columns of `right` are appended
    /// except the join column and any column whose name already exists on the
    /// left; those collisions are skipped with a warning.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecommerce_batch::table::{Column, ColumnType, Row, Table, Value};
    ///
    /// let mut orders = Table::new("orders", vec![Column::new("product_id", ColumnType::Integer)]);
    /// orders.push_row(Row::new(vec![Value::Integer(1)])).unwrap();
    ///
    /// let mut products = Table::new(
    ///     "products",
    ///     vec![
    ///         Column::new("product_id", ColumnType::Integer),
    ///         Column::new("product_name", ColumnType::Text),
    ///     ],
    /// );
    /// products
    ///     .push_row(Row::new(vec![Value::Integer(1), Value::Text("Lamp".into())]))
    ///     .unwrap();
    ///
    /// let merged = orders.left_join(&products, "product_id").unwrap();
    /// assert_eq!(merged.column_names(), vec!["product_id", "product_name"]);
    /// assert_eq!(merged.rows()[0].get(1), &Value::Text("Lamp".into()));
    /// ```
    pub fn left_join(&self, right: &Table, on: &str) -> Result<Table, BatchError> {
        let left_key = self.require_column(on)?;
        let right_key = right.require_column(on)?;

        let mut appended = Vec::with_capacity(right.columns.len());
        for (index, column) in right.columns.iter().enumerate() {
            if index == right_key {
                continue;
            }
            if self.column_index(&column.name).is_some() {
                warn!(
                    "Column {} of {} already exists on {}, keeping the left values",
                    column.name, right.name, self.name
                );
                continue;
            }
            appended.push(index);
        }

        let mut lookup: HashMap<String, Vec<&Row>> = HashMap::with_capacity(right.len());
        for row in &right.rows {
            if let Some(key) = row.get(right_key).key() {
                lookup.entry(key).or_default().push(row);
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(appended.iter().map(|index| right.columns[*index].clone()));

        let mut joined = Table::new(&self.name, columns);
        joined.primary_key = self.primary_key.clone();

        for row in &self.rows {
            let matches = row
                .get(left_key)
                .key()
                .and_then(|key| lookup.get(&key))
                .map(Vec::as_slice)
                .unwrap_or_default();
            if matches.is_empty() {
                let mut values = row.values.clone();
                values.extend(appended.iter().map(|_| Value::Null));
                joined.rows.push(Row::new(values));
                continue;
            }
            for other in matches {
                let mut values = row.values.clone();
                values.extend(appended.iter().map(|index| other.get(*index).clone()));
                joined.rows.push(Row::new(values));
            }
        }

        Ok(joined)
    }
}
