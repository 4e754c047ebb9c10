use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DataError;
use crate::value::{FromValue, Value};

/// One decoded result row: ordered column names and their values.
///
/// Column names are shared between all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Convenience constructor, mostly for tests and mock backends.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
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

    /// Position of a column. Exact match first, then ASCII case-insensitive
    /// (PostgreSQL folds unquoted aliases to lower case).
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.index_of(column).map(|idx| &self.values[idx])
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Decode a named column.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, DataError> {
        let value = self
            .value(column)
            .ok_or_else(|| DataError::schema(format!("column `{column}` missing from result row")))?;
        T::from_value(value.clone())
            .map_err(|e| DataError::schema(format!("column `{column}`: {e}")))
    }

    /// Decode a column by position.
    pub fn get_at<T: FromValue>(&self, index: usize) -> Result<T, DataError> {
        let value = self
            .value_at(index)
            .ok_or_else(|| DataError::schema(format!("result row has no column {index}")))?;
        T::from_value(value.clone())
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Materialization of a result row into a Rust type.
///
/// Implemented by `#[derive(Entity)]` and `#[derive(FromRow)]`.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, DataError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        Ok(row.clone())
    }
}

impl FromRow for HashMap<String, Value> {
    fn from_row(row: &Row) -> Result<Self, DataError> {
        Ok(row.clone().into_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let row = Row::from_pairs([("id", Value::Int(1)), ("Name", Value::from("alice"))]);
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get::<String>("name").unwrap(), "alice");
        assert!(matches!(row.get::<i64>("age"), Err(DataError::Schema(_))));
    }

    #[test]
    fn test_into_map() {
        let row = Row::from_pairs([("a", 1), ("b", 2)]);
        let map = row.into_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"], Value::Int(2));
    }
}
