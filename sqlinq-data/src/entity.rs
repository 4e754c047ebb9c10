//! Field introspection for entity types.
//!
//! The persisted column list of an entity is fixed at compile time by
//! `#[derive(Entity)]`; nothing here inspects instances reflectively.

use crate::error::DataError;
use crate::row::FromRow;
use crate::value::Value;

/// Trait for database entities.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Entity)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[column(generated)]
///     pub id: i64,
///     pub name: String,
///     #[column(name = "mail")]
///     pub email: String,
/// }
/// ```
pub trait Entity: FromRow + Send + Sync + 'static {
    /// Table name in the database.
    fn table_name() -> &'static str;

    /// All persisted column names, in declaration order.
    fn columns() -> &'static [&'static str];

    /// Columns written by INSERT. Excludes database-generated columns.
    fn insert_columns() -> &'static [&'static str] {
        Self::columns()
    }

    /// Key column used by key-matched updates and lookups.
    fn key_column() -> Option<&'static str> {
        None
    }

    /// Columns whose value the database assigns.
    fn generated_columns() -> &'static [&'static str] {
        &[]
    }

    /// Value of one persisted column, or `None` if `column` is not persisted.
    fn field_value(&self, column: &str) -> Option<Value>;

    /// Values aligned with [`Entity::columns`].
    fn values(&self) -> Vec<Value> {
        Self::columns()
            .iter()
            .map(|c| self.field_value(c).unwrap_or(Value::Null))
            .collect()
    }

    /// Values aligned with [`Entity::insert_columns`].
    fn insert_values(&self) -> Vec<Value> {
        Self::insert_columns()
            .iter()
            .map(|c| self.field_value(c).unwrap_or(Value::Null))
            .collect()
    }

    /// Store a database-assigned identity after insertion. Fails when
    /// `key` does not fit the key field's type.
    fn set_generated_key(&mut self, _key: i64) -> Result<(), DataError> {
        Ok(())
    }
}

/// Value of the named persisted field.
pub fn value_of<T: Entity>(entity: &T, column: &str) -> Result<Value, DataError> {
    entity.field_value(column).ok_or_else(|| {
        DataError::schema(format!(
            "`{column}` is not a persisted field of `{}`",
            T::table_name()
        ))
    })
}

/// Static schema descriptor of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub insert_columns: &'static [&'static str],
    pub key: Option<&'static str>,
    pub generated: &'static [&'static str],
}

impl EntitySchema {
    /// Descriptor for `T`. Fails if `T` has no persisted fields.
    pub fn of<T: Entity>() -> Result<Self, DataError> {
        let schema = Self {
            table: T::table_name(),
            columns: T::columns(),
            insert_columns: T::insert_columns(),
            key: T::key_column(),
            generated: T::generated_columns(),
        };
        if schema.columns.is_empty() {
            return Err(DataError::schema(format!(
                "entity `{}` has no persisted fields",
                schema.table
            )));
        }
        Ok(schema)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// The key column, or a configuration error naming `operation`.
    pub fn require_key(&self, operation: &str) -> Result<&'static str, DataError> {
        self.key.ok_or_else(|| {
            DataError::configuration(format!(
                "{operation} requires a key column but `{}` declares none",
                self.table
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    struct Tag {
        id: i64,
        label: String,
    }

    impl FromRow for Tag {
        fn from_row(row: &Row) -> Result<Self, DataError> {
            Ok(Self {
                id: row.get("id")?,
                label: row.get("label")?,
            })
        }
    }

    impl Entity for Tag {
        fn table_name() -> &'static str {
            "tags"
        }
        fn columns() -> &'static [&'static str] {
            &["id", "label"]
        }
        fn insert_columns() -> &'static [&'static str] {
            &["label"]
        }
        fn key_column() -> Option<&'static str> {
            Some("id")
        }
        fn field_value(&self, column: &str) -> Option<Value> {
            match column {
                "id" => Some(Value::Int(self.id)),
                "label" => Some(Value::Text(self.label.clone())),
                _ => None,
            }
        }
    }

    struct Empty;

    impl FromRow for Empty {
        fn from_row(_: &Row) -> Result<Self, DataError> {
            Ok(Empty)
        }
    }

    impl Entity for Empty {
        fn table_name() -> &'static str {
            "empty"
        }
        fn columns() -> &'static [&'static str] {
            &[]
        }
        fn field_value(&self, _: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn test_values_follow_column_order() {
        let tag = Tag { id: 3, label: "rust".into() };
        assert_eq!(tag.values(), vec![Value::Int(3), Value::from("rust")]);
        assert_eq!(tag.insert_values(), vec![Value::from("rust")]);
        // repeated calls are stable
        assert_eq!(Tag::columns(), Tag::columns());
    }

    #[test]
    fn test_value_of_unknown_field() {
        let tag = Tag { id: 3, label: "rust".into() };
        assert_eq!(value_of(&tag, "id").unwrap(), Value::Int(3));
        assert!(matches!(value_of(&tag, "missing"), Err(DataError::Schema(_))));
    }

    #[test]
    fn test_schema_descriptor() {
        let schema = EntitySchema::of::<Tag>().unwrap();
        assert_eq!(schema.table, "tags");
        assert_eq!(schema.require_key("update").unwrap(), "id");
        assert!(schema.has_column("label"));
        assert!(matches!(EntitySchema::of::<Empty>(), Err(DataError::Schema(_))));
    }
}
