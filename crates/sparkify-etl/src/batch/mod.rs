//! Tabular batches
//!
//! A [`Batch`] is a [`Schema`] plus rows of positional [`Value`]s. Every row
//! is checked against the schema when it enters the batch (arity and type),
//! so later stages never see malformed rows.

mod json;
mod schema;
mod value;

pub use json::{from_records, read_json_lines, value_from_json};
pub use schema::{Column, Schema};
pub use value::{ColumnType, Value, TIMESTAMP_FORMAT};

use crate::error::{EtlError, Result};

/// Ordered rows that all conform to one schema
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Batch {
    /// Build a batch, validating every row against `schema`
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut batch = Self::empty(schema);
        batch.rows.reserve(rows.len());
        for row in rows {
            batch.push_row(row)?;
        }
        Ok(batch)
    }

    /// A batch with no rows
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Append a row after checking its arity and value types
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        let index = self.rows.len();
        if row.len() != self.schema.len() {
            return Err(EtlError::InvalidRow {
                row: index,
                column: String::from("*"),
                reason: format!(
                    "expected {} values, found {}",
                    self.schema.len(),
                    row.len()
                ),
            });
        }

        let row = row
            .into_iter()
            .zip(self.schema.columns())
            .map(|(value, column)| {
                value.conform(column.ty).map_err(|rejected| EtlError::InvalidRow {
                    row: index,
                    column: column.name.clone(),
                    reason: format!("expected {}, found {:?}", column.ty, rejected),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let index = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }

    /// Keep only the rows for which `keep` returns true
    pub fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }

    /// Replace every value in place; the result must still fit the schema
    pub fn map_values<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(Value) -> Value,
    {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(&mut f).collect())
            .collect();
        Self::new(self.schema, rows)
    }

    /// Append a column; `values` must hold one value per row
    pub fn with_column(self, column: Column, values: Vec<Value>) -> Result<Self> {
        if values.len() != self.rows.len() {
            return Err(EtlError::schema_mismatch(format!(
                "column '{}' has {} values for {} rows",
                column.name,
                values.len(),
                self.rows.len()
            )));
        }

        let schema = self.schema.with_column(column)?;
        let rows = self
            .rows
            .into_iter()
            .zip(values)
            .map(|(mut row, value)| {
                row.push(value);
                row
            })
            .collect();
        Self::new(schema, rows)
    }

    pub(crate) fn into_parts(self) -> (Schema, Vec<Vec<Value>>) {
        (self.schema, self.rows)
    }
}
