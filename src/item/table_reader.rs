use std::cell::Cell;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    table::{Row, Table},
};

/// Streams the rows of an in-memory table, in order, as step items.
pub struct TableItemReader<'a> {
    table: &'a Table,
    position: Cell<usize>,
}

impl<'a> TableItemReader<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            position: Cell::new(0),
        }
    }
}

impl ItemReader<Row> for TableItemReader<'_> {
    fn read(&self) -> ItemReaderResult<Row> {
        let position = self.position.get();
        match self.table.rows().get(position) {
            Some(row) => {
                self.position.set(position + 1);
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnType, Value};

    #[test]
    fn reads_every_row_then_none() {
        let mut table = Table::new("sales", vec![Column::new("sale_id", ColumnType::Integer)]);
        table.push_row(Row::new(vec![Value::Integer(1)])).unwrap();
        table.push_row(Row::new(vec![Value::Integer(2)])).unwrap();

        let reader = TableItemReader::new(&table);

        assert_eq!(reader.read().unwrap().unwrap().get(0), &Value::Integer(1));
        assert_eq!(reader.read().unwrap().unwrap().get(0), &Value::Integer(2));
        assert!(reader.read().unwrap().is_none());
        assert!(reader.read().unwrap().is_none());
    }
}
