//! Key specs and key-based row filtering

use crate::batch::{Batch, Schema, Value};
use crate::error::{EtlError, Result};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Columns that together identify a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    columns: Vec<String>,
}

impl KeySpec {
    pub fn single(column: impl Into<String>) -> Self {
        Self {
            columns: vec![column.into()],
        }
    }

    pub fn composite<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Positions of the key columns in `schema`
    pub fn resolve(&self, schema: &Schema) -> Result<Vec<usize>> {
        if self.columns.is_empty() {
            return Err(EtlError::schema_mismatch("key has no columns"));
        }
        self.columns.iter().map(|c| schema.require(c)).collect()
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.columns.join(", "))
    }
}

/// Hashable view of a non-null key component
#[derive(Debug, PartialEq, Eq, Hash)]
enum KeyAtom<'a> {
    Text(&'a str),
    Integer(i64),
    Float(u64),
    Timestamp(NaiveDateTime),
}

impl<'a> KeyAtom<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Text(s) => Some(KeyAtom::Text(s)),
            Value::Integer(i) => Some(KeyAtom::Integer(*i)),
            // -0.0 and 0.0 are the same key
            Value::Float(f) if *f == 0.0 => Some(KeyAtom::Float(0.0_f64.to_bits())),
            Value::Float(f) => Some(KeyAtom::Float(f.to_bits())),
            Value::Timestamp(t) => Some(KeyAtom::Timestamp(*t)),
        }
    }
}

/// Drop rows with a null key component, then keep the first row seen for
/// each key tuple. Survivors keep their input order.
pub fn filter_and_dedupe(batch: &Batch, key: &KeySpec) -> Result<Batch> {
    let indices = key.resolve(batch.schema())?;

    let mut seen: HashSet<Vec<KeyAtom<'_>>> = HashSet::with_capacity(batch.len());
    let mut rows = Vec::with_capacity(batch.len());
    let mut null_keys = 0usize;

    for row in batch.rows() {
        let atoms: Option<Vec<KeyAtom<'_>>> =
            indices.iter().map(|&i| KeyAtom::of(&row[i])).collect();
        match atoms {
            None => null_keys += 1,
            Some(atoms) => {
                if seen.insert(atoms) {
                    rows.push(row.clone());
                }
            },
        }
    }

    debug!(
        key = %key,
        input = batch.len(),
        output = rows.len(),
        null_keys,
        "Filtered and deduplicated batch"
    );

    Batch::new(batch.schema().clone(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ColumnType;
    use proptest::prelude::*;

    fn id_foo_bar() -> Schema {
        Schema::from_pairs(&[
            ("id", ColumnType::Integer),
            ("foo", ColumnType::Text),
            ("bar", ColumnType::Text),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_key_keeps_first_row() {
        let batch = Batch::new(
            id_foo_bar(),
            vec![
                vec![Value::Integer(5), "first".into(), Value::Null],
                vec![Value::Integer(6), "other".into(), "x".into()],
                vec![Value::Integer(5), "second".into(), "y".into()],
            ],
        )
        .unwrap();

        let out = filter_and_dedupe(&batch, &KeySpec::single("id")).unwrap();

        assert_eq!(out.len(), 2);
        let fives: Vec<_> = out
            .rows()
            .iter()
            .filter(|row| row[0] == Value::Integer(5))
            .collect();
        assert_eq!(fives.len(), 1);
        assert_eq!(fives[0][1], Value::from("first"));
        assert_eq!(out.rows()[1][0], Value::Integer(6));
    }

    #[test]
    fn test_null_key_row_dropped() {
        let batch = Batch::new(
            id_foo_bar(),
            vec![
                vec![Value::Null, "x".into(), Value::Null],
                vec![Value::Integer(1), "a".into(), "b".into()],
            ],
        )
        .unwrap();

        let out = filter_and_dedupe(&batch, &KeySpec::single("id")).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0][0], Value::Integer(1));
    }

    #[test]
    fn test_empty_text_key_row_dropped() {
        let batch = Batch::new(
            id_foo_bar(),
            vec![
                vec![Value::Integer(1), "".into(), Value::Null],
                vec![Value::Integer(2), "a".into(), "".into()],
            ],
        )
        .unwrap();

        let out = filter_and_dedupe(&batch, &KeySpec::single("foo")).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0], vec![Value::Integer(2), "a".into(), Value::Null]);
    }

    #[test]
    fn test_composite_key() {
        let schema = Schema::from_pairs(&[
            ("foo", ColumnType::Integer),
            ("bar", ColumnType::Integer),
            ("baz", ColumnType::Text),
        ])
        .unwrap();
        let batch = Batch::new(
            schema,
            vec![
                vec![Value::Integer(2), Value::Integer(1), "a".into()],
                vec![Value::Integer(1), Value::Integer(1), "b".into()],
                vec![Value::Integer(2), Value::Integer(1), "c".into()],
                vec![Value::Integer(1), Value::Null, "d".into()],
            ],
        )
        .unwrap();

        let out = filter_and_dedupe(&batch, &KeySpec::composite(["foo", "bar"])).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0][2], Value::from("a"));
        assert_eq!(out.rows()[1][2], Value::from("b"));
    }

    #[test]
    fn test_unknown_or_empty_key_is_schema_mismatch() {
        let batch = Batch::empty(id_foo_bar());
        assert!(matches!(
            filter_and_dedupe(&batch, &KeySpec::single("song_id")),
            Err(EtlError::SchemaMismatch(_))
        ));
        assert!(matches!(
            filter_and_dedupe(&batch, &KeySpec::composite(Vec::<String>::new())),
            Err(EtlError::SchemaMismatch(_))
        ));
    }

    fn arb_cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            1 => Just(Value::Null),
            4 => (0i64..4).prop_map(Value::Integer),
        ]
    }

    proptest! {
        #[test]
        fn prop_no_null_or_repeated_keys(rows in prop::collection::vec((arb_cell(), arb_cell(), "[a-c]{0,2}"), 0..40)) {
            let schema = Schema::from_pairs(&[
                ("a", ColumnType::Integer),
                ("b", ColumnType::Integer),
                ("payload", ColumnType::Text),
            ])
            .unwrap();
            let rows: Vec<Vec<Value>> = rows
                .into_iter()
                .map(|(a, b, payload)| vec![a, b, Value::Text(payload)])
                .collect();
            let input = Batch::new(schema, rows).unwrap();

            let out = filter_and_dedupe(&input, &KeySpec::composite(["a", "b"])).unwrap();

            let mut keys = HashSet::new();
            for row in out.rows() {
                prop_assert!(!row[0].is_null() && !row[1].is_null());
                prop_assert!(keys.insert((row[0].as_i64(), row[1].as_i64())));
            }

            let distinct_input: HashSet<_> = input
                .rows()
                .iter()
                .filter(|row| !row[0].is_null() && !row[1].is_null())
                .map(|row| (row[0].as_i64(), row[1].as_i64()))
                .collect();
            prop_assert_eq!(keys.len(), distinct_input.len());
        }
    }
}
