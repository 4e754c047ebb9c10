//! The boundary to database clients.
//!
//! Backends (see `sqlinq-data-sqlx`) implement [`Database`] for a pool and
//! [`TransactionHandle`] for a transaction begun from it. The core issues
//! nothing but these primitives.

use async_trait::async_trait;

use crate::error::DataError;
use crate::query::{Dialect, Statement};
use crate::row::Row;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identity assigned by the last insert, where the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// A direct (non-transactional) database handle.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Rendering dialect for statements sent to this database.
    fn dialect(&self) -> Dialect;

    async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DataError>;

    async fn query_many(&self, stmt: &Statement) -> Result<Vec<Row>, DataError>;

    async fn query_one(&self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        Ok(self.query_many(stmt).await?.into_iter().next())
    }

    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DataError>;
}

/// An open transaction. Consumed by `commit` or `rollback`; dropping it
/// without either rolls back.
#[async_trait]
pub trait TransactionHandle: Send {
    async fn execute(&mut self, stmt: &Statement) -> Result<ExecResult, DataError>;

    async fn query_many(&mut self, stmt: &Statement) -> Result<Vec<Row>, DataError>;

    async fn query_one(&mut self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        Ok(self.query_many(stmt).await?.into_iter().next())
    }

    async fn commit(self: Box<Self>) -> Result<(), DataError>;

    async fn rollback(self: Box<Self>) -> Result<(), DataError>;
}
