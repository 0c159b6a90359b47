use std::cell::Cell;

use log::{debug, error};
use sqlx::{query_builder::Separated, Pool, QueryBuilder, Sqlite};

use crate::core::item::{ItemWriter, ItemWriterResult};
use crate::item::rdbc::{block_on, Dialect, TableSchema};
use crate::table::{Row, Table, Value};
use crate::BatchError;

/// Upserts table rows into SQLite.
///
/// Rows are written with one multi-row `INSERT ... ON CONFLICT(key) DO
/// UPDATE` statement per chunk (split further when a chunk would exceed the
/// bind parameter limit). Columns are taken from each row by the positions
/// resolved against the source table when the writer was built, so the
/// source may carry extra columns or a different column order.
///
/// # Examples
///
/// ```no_run
/// use ecommerce_batch::core::item::ItemWriter;
/// use ecommerce_batch::item::csv::csv_reader::CsvTableReaderBuilder;
/// use ecommerce_batch::item::rdbc::{SqliteUpsertWriterBuilder, TableSchema};
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite://ecommerce.db").await?;
/// let products = CsvTableReaderBuilder::new().read_path("products", "products.csv")?;
/// let schema = TableSchema::products();
///
/// let writer = SqliteUpsertWriterBuilder::new()
///     .pool(&pool)
///     .schema(&schema)
///     .create_table(true)
///     .build(&products)?;
///
/// writer.open()?;
/// writer.write(products.rows())?;
/// # Ok(())
/// # }
/// ```
pub struct SqliteUpsertWriter<'a> {
    pool: &'a Pool<Sqlite>,
    schema: &'a TableSchema,
    indices: Vec<usize>,
    create_table: bool,
    upserted: Cell<usize>,
}

impl SqliteUpsertWriter<'_> {
    /// Number of rows sent to the database so far.
    pub fn upserted(&self) -> usize {
        self.upserted.get()
    }

    fn bind(value: &Value, separated: &mut Separated<'_, '_, Sqlite, &'static str>) {
        match value {
            Value::Null => separated.push_bind(None::<String>),
            Value::Integer(v) => separated.push_bind(*v),
            Value::Float(v) => separated.push_bind(*v),
            Value::Date(_) | Value::Text(_) => separated.push_bind(value.to_string()),
        };
    }

    fn write_statement(&self, rows: &[Row]) -> ItemWriterResult {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(self.schema.insert_prefix());

        query_builder.push_values(rows, |mut separated, row| {
            for index in &self.indices {
                Self::bind(row.get(*index), &mut separated);
            }
        });
        query_builder.push(self.schema.conflict_clause(Dialect::Sqlite));

        let query = query_builder.build();

        match block_on(query.execute(self.pool))? {
            Ok(_) => {
                debug!(
                    "Successfully upserted {} rows into SQLite table {}",
                    rows.len(),
                    self.schema.table()
                );
                self.upserted.set(self.upserted.get() + rows.len());
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to upsert rows into SQLite table {}: {}",
                    self.schema.table(),
                    e
                );
                Err(BatchError::ItemWriter(format!("SQLite upsert failed: {}", e)))
            }
        }
    }
}

impl ItemWriter<Row> for SqliteUpsertWriter<'_> {
    /// Creates the target table when configured to.
    fn open(&self) -> ItemWriterResult {
        if !self.create_table {
            return Ok(());
        }

        let ddl = self.schema.create_table_sql(Dialect::Sqlite);
        block_on(sqlx::query(&ddl).execute(self.pool))?
            .map(|_| ())
            .map_err(|e| BatchError::Database(format!("{}: {}", ddl, e)))
    }

    fn write(&self, items: &[Row]) -> ItemWriterResult {
        if items.is_empty() {
            return Ok(());
        }

        for rows in items.chunks(self.schema.rows_per_statement()) {
            self.write_statement(rows)?;
        }
        Ok(())
    }
}

/// Builder for [`SqliteUpsertWriter`]. Pool and schema are required.
#[derive(Default)]
pub struct SqliteUpsertWriterBuilder<'a> {
    pool: Option<&'a Pool<Sqlite>>,
    schema: Option<&'a TableSchema>,
    create_table: bool,
}

impl<'a> SqliteUpsertWriterBuilder<'a> {
    /// Creates a builder that does not create tables.
    pub fn new() -> Self {
        Self {
            pool: None,
            schema: None,
            create_table: false,
        }
    }

    /// SQLite pool the writer executes on.
    pub fn pool(mut self, pool: &'a Pool<Sqlite>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Target table, its columns and conflict policy.
    pub fn schema(mut self, schema: &'a TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Issue `CREATE TABLE IF NOT EXISTS` when the writer is opened.
    pub fn create_table(mut self, yes: bool) -> Self {
        self.create_table = yes;
        self
    }

    /// Builds a writer for rows shaped like `source`.
    ///
    /// # Errors
    /// `BatchError::Schema` when `source` lacks a schema column,
    /// `BatchError::Configuration` when the pool or schema is unset.
    pub fn build(self, source: &Table) -> Result<SqliteUpsertWriter<'a>, BatchError> {
        let pool = self
            .pool
            .ok_or_else(|| BatchError::Configuration("SQLite writer has no pool".to_string()))?;
        let schema = self
            .schema
            .ok_or_else(|| BatchError::Configuration("SQLite writer has no schema".to_string()))?;

        Ok(SqliteUpsertWriter {
            pool,
            schema,
            indices: schema.resolve(source)?,
            create_table: self.create_table,
            upserted: Cell::new(0),
        })
    }
}
