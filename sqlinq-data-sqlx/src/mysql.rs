//! MySQL binding and decoding. Also serves StarRocks through
//! [`SqlxDatabase::with_dialect`](crate::SqlxDatabase::with_dialect).

use std::sync::Arc;

use sqlinq_data::{DataError, Dialect, Row, Statement, Value};
use sqlx::mysql::{MySql, MySqlQueryResult, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, Decode, Row as _, TypeInfo as _, ValueRef as _};

use crate::SqlxErrorExt;

pub(crate) const DIALECT: Dialect = Dialect::MySql;

type MySqlQuery<'q> = Query<'q, MySql, <MySql as sqlx::Database>::Arguments<'q>>;

pub(crate) fn build(stmt: &Statement) -> MySqlQuery<'_> {
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

pub(crate) fn last_insert_id(result: &MySqlQueryResult) -> Option<i64> {
    i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0)
}

pub(crate) fn decode_row(row: &MySqlRow) -> Result<Row, DataError> {
    let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len())
        .map(|i| decode_cell(row, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns, values))
}

fn get<'r, T: Decode<'r, MySql>>(row: &'r MySqlRow, index: usize) -> Result<T, DataError> {
    row.try_get_unchecked(index).map_err(SqlxErrorExt::into_data_error)
}

fn decode_cell(row: &MySqlRow, index: usize) -> Result<Value, DataError> {
    let type_name = {
        let raw = row.try_get_raw(index).map_err(SqlxErrorExt::into_data_error)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_ascii_uppercase()
    };
    let name = type_name.as_str();
    Ok(if name == "BOOLEAN" {
        Value::Bool(get(row, index)?)
    } else if name.contains("INT") && name.ends_with("UNSIGNED") {
        let n: u64 = get(row, index)?;
        match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        }
    } else if name.contains("INT") {
        Value::Int(get(row, index)?)
    } else if name == "FLOAT" {
        Value::Float(f64::from(get::<f32>(row, index)?))
    } else if name == "DOUBLE" {
        Value::Float(get(row, index)?)
    } else if name == "DECIMAL" {
        // Sent as text; SUM and AVG over integers come back as DECIMAL.
        let text: String = get(row, index)?;
        match text.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::Text(text),
        }
    } else if name.contains("BLOB") || name.contains("BINARY") || name == "BIT" {
        Value::Bytes(get(row, index)?)
    } else {
        Value::Text(get(row, index)?)
    })
}
