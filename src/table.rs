// The materialized table: a schema plus one column per field.

use crate::column::Column;
use crate::schema::Schema;

/// Column-major result of a parse. Owns its columns; columns own their
/// value arrays and pools.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    columns: Vec<Column>,
}

impl Table {
    pub(crate) fn new(schema: Schema, columns: Vec<Column>) -> Self {
        debug_assert_eq!(schema.len(), columns.len());
        Table { schema, columns }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.schema.index_of(name).and_then(|i| self.columns.get(i))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }
}
