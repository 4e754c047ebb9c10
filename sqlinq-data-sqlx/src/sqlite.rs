//! SQLite binding and decoding.

use std::sync::Arc;

use sqlinq_data::{DataError, Dialect, Row, Statement, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteQueryResult, SqliteRow};
use sqlx::{Column as _, Decode, Row as _, TypeInfo as _, ValueRef as _};

use crate::SqlxErrorExt;

pub(crate) const DIALECT: Dialect = Dialect::Sqlite;

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as sqlx::Database>::Arguments<'q>>;

pub(crate) fn build(stmt: &Statement) -> SqliteQuery<'_> {
    stmt.args
        .iter()
        .fold(sqlx::query(&stmt.sql), |query, value| match value {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        })
}

pub(crate) fn last_insert_id(result: &SqliteQueryResult) -> Option<i64> {
    Some(result.last_insert_rowid())
}

pub(crate) fn decode_row(row: &SqliteRow) -> Result<Row, DataError> {
    let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len())
        .map(|i| decode_cell(row, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns, values))
}

fn get<'r, T: Decode<'r, Sqlite>>(row: &'r SqliteRow, index: usize) -> Result<T, DataError> {
    row.try_get_unchecked(index).map_err(SqlxErrorExt::into_data_error)
}

/// Decoded by the storage class of the value, not the declared column type.
fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, DataError> {
    let type_name = {
        let raw = row.try_get_raw(index).map_err(SqlxErrorExt::into_data_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    Ok(match type_name.as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => Value::Int(get(row, index)?),
        "BOOLEAN" => Value::Bool(get(row, index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => Value::Float(get(row, index)?),
        "BLOB" => Value::Bytes(get(row, index)?),
        _ => Value::Text(get(row, index)?),
    })
}
