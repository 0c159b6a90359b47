//! Relational persistence of tables through one generic upsert operation.
//!
//! A [`TableSchema`] describes a target table: its name, the columns the
//! source table must provide, the primary key and what happens when a row
//! with an existing key arrives ([`ConflictPolicy`]). The per-database
//! writers ([`SqliteUpsertWriter`], `MySqlUpsertWriter`) only differ in the
//! SQL dialect and the driver they bind values with; every dataset goes
//! through the same code path.

use std::future::Future;

use log::info;
use serde::Deserialize;

use crate::{
    core::item::ItemWriter,
    table::{ColumnType, Row, Table},
    BatchError,
};

#[cfg(feature = "rdbc-mysql")]
pub mod mysql_writer;

#[cfg(feature = "rdbc-sqlite")]
pub mod sqlite_writer;

#[cfg(feature = "rdbc-mysql")]
pub use mysql_writer::{MySqlUpsertWriter, MySqlUpsertWriterBuilder};
#[cfg(feature = "rdbc-sqlite")]
pub use sqlite_writer::{SqliteUpsertWriter, SqliteUpsertWriterBuilder};

// The number of parameters in MySQL must fit in a `u16`; SQLite's default
// limit is lower.
const BIND_LIMIT: usize = 32766;

/// What an insert does when the primary key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Overwrite every non-key column with the incoming values.
    #[default]
    UpdateAll,
    /// Keep the stored row.
    Ignore,
}

/// SQL flavour used to render statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `ON CONFLICT(key)` clauses, dates stored as ISO-8601 text.
    Sqlite,
    /// `ON DUPLICATE KEY UPDATE` clauses; also used for MariaDB.
    MySql,
}

impl Dialect {
    fn column_type(&self, column_type: ColumnType, is_key: bool) -> &'static str {
        match (self, column_type) {
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnType::Float) => "REAL",
            (Dialect::Sqlite, ColumnType::Date | ColumnType::Text) => "TEXT",
            (Dialect::MySql, ColumnType::Integer) => "BIGINT",
            (Dialect::MySql, ColumnType::Float) => "DOUBLE",
            (Dialect::MySql, ColumnType::Date) => "DATE",
            // MySQL cannot index an unbounded TEXT key.
            (Dialect::MySql, ColumnType::Text) if is_key => "VARCHAR(255)",
            (Dialect::MySql, ColumnType::Text) => "TEXT",
        }
    }
}

/// Descriptor of a persisted table.
///
/// Column order is the order of the `INSERT` column list; the key always
/// comes first. Conflicts default to [`ConflictPolicy::UpdateAll`].
///
/// # Examples
///
/// ```
/// use ecommerce_batch::item::rdbc::{ConflictPolicy, Dialect, TableSchema};
/// use ecommerce_batch::table::ColumnType;
///
/// let schema = TableSchema::new("coupons", "code", ColumnType::Text)
///     .column("discount", ColumnType::Float)
///     .conflict_policy(ConflictPolicy::Ignore);
///
/// assert_eq!(schema.column_names(), vec!["code", "discount"]);
/// assert_eq!(
///     schema.create_table_sql(Dialect::Sqlite),
///     "CREATE TABLE IF NOT EXISTS coupons (code TEXT PRIMARY KEY, discount REAL)"
/// );
/// assert_eq!(
///     schema.conflict_clause(Dialect::Sqlite),
///     " ON CONFLICT(code) DO NOTHING"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    table: String,
    columns: Vec<(String, ColumnType)>,
    primary_key: String,
    conflict_policy: ConflictPolicy,
}

impl TableSchema {
    /// Starts a schema whose first column is the primary key.
    pub fn new(table: &str, primary_key: &str, key_type: ColumnType) -> Self {
        Self {
            table: table.to_string(),
            columns: vec![(primary_key.to_string(), key_type)],
            primary_key: primary_key.to_string(),
            conflict_policy: ConflictPolicy::UpdateAll,
        }
    }

    /// Appends a non-key column the source table must provide.
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.columns.push((name.to_string(), column_type));
        self
    }

    /// What to do with rows whose key is already stored.
    pub fn conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;
        self
    }

    /// `customers(customer_id, name, email)`.
    pub fn customers() -> Self {
        Self::new("customers", "customer_id", ColumnType::Integer)
            .column("name", ColumnType::Text)
            .column("email", ColumnType::Text)
    }

    /// `orders(order_id, customer_id, product_id, quantity, order_date)`.
    pub fn orders() -> Self {
        Self::new("orders", "order_id", ColumnType::Integer)
            .column("customer_id", ColumnType::Integer)
            .column("product_id", ColumnType::Integer)
            .column("quantity", ColumnType::Integer)
            .column("order_date", ColumnType::Date)
    }

    /// `products(product_id, product_name, price)`.
    pub fn products() -> Self {
        Self::new("products", "product_id", ColumnType::Integer)
            .column("product_name", ColumnType::Text)
            .column("price", ColumnType::Float)
    }

    /// `sales(sale_id, product_id, quantity_sold, sale_date)`.
    pub fn sales() -> Self {
        Self::new("sales", "sale_id", ColumnType::Integer)
            .column("product_id", ColumnType::Integer)
            .column("quantity_sold", ColumnType::Integer)
            .column("sale_date", ColumnType::Date)
    }

    /// Built-in schema of one of the four pipeline datasets.
    pub fn for_dataset(name: &str) -> Option<Self> {
        match name {
            "customers" => Some(Self::customers()),
            "orders" => Some(Self::orders()),
            "products" => Some(Self::products()),
            "sales" => Some(Self::sales()),
            _ => None,
        }
    }

    /// Name of the target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Every column, key first.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Positions of the schema columns inside `source`, in schema order.
    ///
    /// # Errors
    /// `BatchError::Schema` listing every required column `source` lacks.
    pub fn resolve(&self, source: &Table) -> Result<Vec<usize>, BatchError> {
        let mut missing = Vec::new();
        let mut indices = Vec::with_capacity(self.columns.len());

        for (name, _) in &self.columns {
            match source.column_index(name) {
                Some(index) => indices.push(index),
                None => missing.push(name.as_str()),
            }
        }

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(BatchError::Schema(format!(
                "Missing columns in {}: {}",
                self.table,
                missing.join(", ")
            )))
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` statement with the key as primary key.
    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(name, column_type)| {
                let is_key = *name == self.primary_key;
                let sql_type = dialect.column_type(*column_type, is_key);
                if is_key {
                    format!("{} {} PRIMARY KEY", name, sql_type)
                } else {
                    format!("{} {}", name, sql_type)
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            columns.join(", ")
        )
    }

    /// `INSERT INTO table (columns) ` prefix; the caller appends the values.
    pub fn insert_prefix(&self) -> String {
        format!(
            "INSERT INTO {} ({}) ",
            self.table,
            self.column_names().join(", ")
        )
    }

    /// Conflict clause appended after the `VALUES` list.
    pub fn conflict_clause(&self, dialect: Dialect) -> String {
        let updated: Vec<&str> = self
            .column_names()
            .into_iter()
            .filter(|name| *name != self.primary_key)
            .collect();

        match (dialect, self.conflict_policy) {
            (Dialect::Sqlite, ConflictPolicy::Ignore) => {
                format!(" ON CONFLICT({}) DO NOTHING", self.primary_key)
            }
            (Dialect::Sqlite, ConflictPolicy::UpdateAll) if updated.is_empty() => {
                format!(" ON CONFLICT({}) DO NOTHING", self.primary_key)
            }
            (Dialect::Sqlite, ConflictPolicy::UpdateAll) => format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                self.primary_key,
                updated
                    .iter()
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            (Dialect::MySql, ConflictPolicy::Ignore) => format!(
                " ON DUPLICATE KEY UPDATE {k} = {k}",
                k = self.primary_key
            ),
            (Dialect::MySql, ConflictPolicy::UpdateAll) if updated.is_empty() => format!(
                " ON DUPLICATE KEY UPDATE {k} = {k}",
                k = self.primary_key
            ),
            (Dialect::MySql, ConflictPolicy::UpdateAll) => format!(
                " ON DUPLICATE KEY UPDATE {}",
                updated
                    .iter()
                    .map(|c| format!("{c} = VALUES({c})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Largest number of rows one statement may carry.
    fn rows_per_statement(&self) -> usize {
        (BIND_LIMIT / self.columns.len().max(1)).max(1)
    }
}

/// Runs a driver future to completion from synchronous writer code.
///
/// Requires a multi-thread tokio runtime: the worker is told it is about to
/// block before the future is driven on the current handle.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, BatchError> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|error| BatchError::Database(format!("no tokio runtime: {}", error)))?;
    Ok(tokio::task::block_in_place(|| handle.block_on(future)))
}

/// Connection pool of whichever database the URL points at.
pub enum DatabasePool {
    /// Single-connection pool on a SQLite file, created when missing.
    #[cfg(feature = "rdbc-sqlite")]
    Sqlite(sqlx::SqlitePool),
    /// MySQL or MariaDB pool.
    #[cfg(feature = "rdbc-mysql")]
    MySql(sqlx::MySqlPool),
}

impl DatabasePool {
    /// Connects to `sqlite:` or `mysql:` URLs, depending on enabled features.
    pub fn connect(url: &str) -> Result<Self, BatchError> {
        let database_error = |error: sqlx::Error| BatchError::Database(error.to_string());

        #[cfg(feature = "rdbc-sqlite")]
        if url.starts_with("sqlite:") {
            use std::str::FromStr;

            let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)
                .map_err(database_error)?
                .create_if_missing(true);
            let pool = block_on(
                sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(options),
            )?
            .map_err(database_error)?;
            info!("Connected to SQLite database {}", url);
            return Ok(DatabasePool::Sqlite(pool));
        }

        #[cfg(feature = "rdbc-mysql")]
        if url.starts_with("mysql:") {
            let pool = block_on(sqlx::MySqlPool::connect(url))?.map_err(database_error)?;
            info!("Connected to MySQL database");
            return Ok(DatabasePool::MySql(pool));
        }

        let _ = database_error;
        Err(BatchError::Configuration(format!(
            "unsupported database url {}: enable the matching rdbc feature",
            url
        )))
    }

    /// Builds the upsert writer of `schema` for rows shaped like `source`.
    ///
    /// # Errors
    /// `BatchError::Schema` when `source` lacks a column of `schema`.
    pub fn upsert_writer<'a>(
        &'a self,
        schema: &'a TableSchema,
        source: &Table,
        create_table: bool,
    ) -> Result<Box<dyn ItemWriter<Row> + 'a>, BatchError> {
        match self {
            #[cfg(feature = "rdbc-sqlite")]
            DatabasePool::Sqlite(pool) => Ok(Box::new(
                SqliteUpsertWriterBuilder::new()
                    .pool(pool)
                    .schema(schema)
                    .create_table(create_table)
                    .build(source)?,
            )),
            #[cfg(feature = "rdbc-mysql")]
            DatabasePool::MySql(pool) => Ok(Box::new(
                MySqlUpsertWriterBuilder::new()
                    .pool(pool)
                    .schema(schema)
                    .create_table(create_table)
                    .build(source)?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn sqlite_upsert_updates_every_non_key_column() {
        let schema = TableSchema::products();

        assert_eq!(
            schema.insert_prefix(),
            "INSERT INTO products (product_id, product_name, price) "
        );
        assert_eq!(
            schema.conflict_clause(Dialect::Sqlite),
            " ON CONFLICT(product_id) DO UPDATE SET product_name = excluded.product_name, price = excluded.price"
        );
    }

    #[test]
    fn mysql_upsert_uses_duplicate_key_update() {
        let schema = TableSchema::sales();

        assert_eq!(
            schema.conflict_clause(Dialect::MySql),
            " ON DUPLICATE KEY UPDATE product_id = VALUES(product_id), quantity_sold = VALUES(quantity_sold), sale_date = VALUES(sale_date)"
        );
    }

    #[test]
    fn ignore_policy_keeps_stored_rows() {
        let schema = TableSchema::customers().conflict_policy(ConflictPolicy::Ignore);

        assert_eq!(
            schema.conflict_clause(Dialect::Sqlite),
            " ON CONFLICT(customer_id) DO NOTHING"
        );
        assert_eq!(
            schema.conflict_clause(Dialect::MySql),
            " ON DUPLICATE KEY UPDATE customer_id = customer_id"
        );
    }

    #[test]
    fn create_table_marks_the_primary_key() {
        assert_eq!(
            TableSchema::customers().create_table_sql(Dialect::Sqlite),
            "CREATE TABLE IF NOT EXISTS customers (customer_id INTEGER PRIMARY KEY, name TEXT, email TEXT)"
        );
        assert_eq!(
            TableSchema::orders().create_table_sql(Dialect::MySql),
            "CREATE TABLE IF NOT EXISTS orders (order_id BIGINT PRIMARY KEY, customer_id BIGINT, product_id BIGINT, quantity BIGINT, order_date DATE)"
        );
    }

    #[test]
    fn resolve_lists_every_missing_column() {
        let source = Table::new(
            "customers",
            vec![
                Column::new("email", ColumnType::Text),
                Column::new("customer_id", ColumnType::Integer),
            ],
        );

        assert!(matches!(
            TableSchema::customers().resolve(&source),
            Err(BatchError::Schema(msg)) if msg == "Missing columns in customers: name"
        ));

        let complete = Table::new(
            "customers",
            vec![
                Column::new("email", ColumnType::Text),
                Column::new("name", ColumnType::Text),
                Column::new("customer_id", ColumnType::Integer),
            ],
        );
        assert_eq!(TableSchema::customers().resolve(&complete).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn dataset_names_map_to_builtin_schemas() {
        assert_eq!(TableSchema::for_dataset("orders").unwrap().primary_key(), "order_id");
        assert!(TableSchema::for_dataset("returns").is_none());
    }

    #[test]
    fn statements_stay_under_the_bind_limit() {
        assert_eq!(TableSchema::orders().rows_per_statement(), BIND_LIMIT / 5);
    }
}
