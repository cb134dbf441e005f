//! Ordered, typed column schemas

use crate::batch::ColumnType;
use crate::error::{EtlError, Result};
use std::collections::HashSet;

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered list of uniquely named columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EtlError::schema_mismatch(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Build a schema from `(name, type)` pairs
    pub fn from_pairs(pairs: &[(&str, ColumnType)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|(name, ty)| Column::new(*name, *ty))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Position of `name`, or a `SchemaMismatch` naming the missing column
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| {
            EtlError::schema_mismatch(format!(
                "column '{}' not found (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Schema with one more column appended
    pub fn with_column(&self, column: Column) -> Result<Self> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Schema::from_pairs(&[("id", ColumnType::Integer), ("id", ColumnType::Text)]);
        assert!(matches!(result, Err(EtlError::SchemaMismatch(_))));
    }

    #[test]
    fn test_require_reports_missing_column() {
        let schema = Schema::from_pairs(&[("id", ColumnType::Integer)]).unwrap();
        assert_eq!(schema.require("id").unwrap(), 0);

        let err = schema.require("title").unwrap_err().to_string();
        assert!(err.contains("title"));
    }
}
