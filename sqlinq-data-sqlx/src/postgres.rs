//! Postgres binding and decoding.
//!
//! SUM and AVG are rendered as `DOUBLE PRECISION` for this dialect, so
//! aggregate results decode without a decimal crate. `NUMERIC` and
//! temporal columns must be cast in the projection.

use std::sync::Arc;

use sqlinq_data::{DataError, Dialect, Row, Statement, Value};
use sqlx::postgres::{PgQueryResult, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column as _, Decode, Row as _, TypeInfo as _, ValueRef as _};

use crate::SqlxErrorExt;

pub(crate) const DIALECT: Dialect = Dialect::Postgres;

type PgQuery<'q> = Query<'q, Postgres, <Postgres as sqlx::Database>::Arguments<'q>>;

// NULL binds as INT8; writing NULL into a column of another type needs a
// typed value or a cast in the statement.
pub(crate) fn build(stmt: &Statement) -> PgQuery<'_> {
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

pub(crate) fn last_insert_id(_result: &PgQueryResult) -> Option<i64> {
    None
}

pub(crate) fn decode_row(row: &PgRow) -> Result<Row, DataError> {
    let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len())
        .map(|i| decode_cell(row, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns, values))
}

fn get<'r, T: Decode<'r, Postgres>>(row: &'r PgRow, index: usize) -> Result<T, DataError> {
    row.try_get_unchecked(index).map_err(SqlxErrorExt::into_data_error)
}

fn decode_cell(row: &PgRow, index: usize) -> Result<Value, DataError> {
    let type_name = {
        let raw = row.try_get_raw(index).map_err(SqlxErrorExt::into_data_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    Ok(match type_name.as_str() {
        "INT2" => Value::Int(i64::from(get::<i16>(row, index)?)),
        "INT4" => Value::Int(i64::from(get::<i32>(row, index)?)),
        "INT8" => Value::Int(get(row, index)?),
        "FLOAT4" => Value::Float(f64::from(get::<f32>(row, index)?)),
        "FLOAT8" => Value::Float(get(row, index)?),
        "BOOL" => Value::Bool(get(row, index)?),
        "BYTEA" => Value::Bytes(get(row, index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN" => Value::Text(get(row, index)?),
        other => {
            return Err(DataError::schema(format!(
                "unsupported Postgres column type {other} at index {index}; cast it in the projection"
            )))
        }
    })
}
