/// CSV readers loading whole tables and a row writer.
pub mod csv;

/// Reader streaming the rows of an in-memory table.
pub mod table_reader;

/// Relational upsert writers (SQLite, MySQL).
pub mod rdbc;
