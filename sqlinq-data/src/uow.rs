//! Unit of work: one transaction, retired exactly once.
//!
//! ```text
//! Unattached --begin--> Open --commit/rollback--> Closed
//! ```
//!
//! `Closed` is terminal; start a new `UnitOfWork` for the next transaction.
//! The handle is cheap to clone and every clone drives the same transaction.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::error::DataError;
use crate::executor::{Database, ExecResult, TransactionHandle};
use crate::log::{Operation, QueryEvent, QueryLogger, TracingLogger};
use crate::query::{Dialect, Statement};
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Unattached,
    Open,
    Closed,
}

enum TxState {
    Unattached,
    Open(Box<dyn TransactionHandle>),
    Closed,
}

impl TxState {
    fn status(&self) -> UnitOfWorkState {
        match self {
            TxState::Unattached => UnitOfWorkState::Unattached,
            TxState::Open(_) => UnitOfWorkState::Open,
            TxState::Closed => UnitOfWorkState::Closed,
        }
    }
}

struct Inner {
    db: Arc<dyn Database>,
    logger: Arc<dyn QueryLogger>,
    state: Mutex<TxState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let TxState::Open(_) = self.state.get_mut() {
            tracing::warn!("Unit of work dropped with an open transaction, rolling back");
        }
    }
}

#[derive(Clone)]
pub struct UnitOfWork {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("dialect", &self.inner.db.dialect())
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_logger(db, Arc::new(TracingLogger::default()))
    }

    pub fn with_logger(db: Arc<dyn Database>, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                logger,
                state: Mutex::new(TxState::Unattached),
            }),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.db.dialect()
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.inner.db
    }

    /// Whether both handles drive the same transaction.
    pub fn same_as(&self, other: &UnitOfWork) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn status(&self) -> UnitOfWorkState {
        self.inner.state.lock().await.status()
    }

    pub async fn begin(&self) -> Result<(), DataError> {
        let mut state = self.inner.state.lock().await;
        match &*state {
            TxState::Unattached => {}
            TxState::Open(_) => return Err(DataError::invalid_state("transaction already open")),
            TxState::Closed => return Err(DataError::invalid_state("unit of work is closed")),
        }
        let started = Instant::now();
        let result = self.inner.db.begin().await;
        self.report(Operation::Begin, started, result.as_ref().err());
        *state = TxState::Open(result?);
        Ok(())
    }

    pub async fn commit(&self) -> Result<(), DataError> {
        let tx = self.take_open("commit").await?;
        let started = Instant::now();
        let result = tx.commit().await;
        self.report(Operation::Commit, started, result.as_ref().err());
        result
    }

    pub async fn rollback(&self) -> Result<(), DataError> {
        let tx = self.take_open("rollback").await?;
        let started = Instant::now();
        let result = tx.rollback().await;
        self.report(Operation::Rollback, started, result.as_ref().err());
        result
    }

    /// Move an open handle out, leaving the unit of work closed whatever
    /// the outcome of the commit or rollback that follows.
    async fn take_open(&self, operation: &str) -> Result<Box<dyn TransactionHandle>, DataError> {
        let mut state = self.inner.state.lock().await;
        match std::mem::replace(&mut *state, TxState::Closed) {
            TxState::Open(tx) => Ok(tx),
            TxState::Unattached => {
                *state = TxState::Unattached;
                Err(DataError::invalid_state(format!("{operation} without an open transaction")))
            }
            TxState::Closed => Err(DataError::invalid_state(format!("{operation} on a closed unit of work"))),
        }
    }

    /// Execute a statement on the open transaction.
    pub async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DataError> {
        let started = Instant::now();
        let result = self.execute_unlogged(stmt).await;
        log_statement(&*self.inner.logger, Operation::Execute, stmt, started, result.as_ref().err());
        result
    }

    pub async fn query_many(&self, stmt: &Statement) -> Result<Vec<Row>, DataError> {
        let started = Instant::now();
        let result = self.query_many_unlogged(stmt).await;
        log_statement(&*self.inner.logger, Operation::Query, stmt, started, result.as_ref().err());
        result
    }

    pub async fn query_one(&self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        let started = Instant::now();
        let result = self.query_one_unlogged(stmt).await;
        log_statement(&*self.inner.logger, Operation::Query, stmt, started, result.as_ref().err());
        result
    }

    pub(crate) async fn execute_unlogged(&self, stmt: &Statement) -> Result<ExecResult, DataError> {
        let mut state = self.inner.state.lock().await;
        match &mut *state {
            TxState::Open(tx) => tx.execute(stmt).await,
            TxState::Unattached => Err(DataError::invalid_state("unit of work has no open transaction")),
            TxState::Closed => Err(DataError::invalid_state("unit of work is closed")),
        }
    }

    pub(crate) async fn query_many_unlogged(&self, stmt: &Statement) -> Result<Vec<Row>, DataError> {
        let mut state = self.inner.state.lock().await;
        match &mut *state {
            TxState::Open(tx) => tx.query_many(stmt).await,
            TxState::Unattached => Err(DataError::invalid_state("unit of work has no open transaction")),
            TxState::Closed => Err(DataError::invalid_state("unit of work is closed")),
        }
    }

    pub(crate) async fn query_one_unlogged(&self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        let mut state = self.inner.state.lock().await;
        match &mut *state {
            TxState::Open(tx) => tx.query_one(stmt).await,
            TxState::Unattached => Err(DataError::invalid_state("unit of work has no open transaction")),
            TxState::Closed => Err(DataError::invalid_state("unit of work is closed")),
        }
    }

    /// Begin, run `f` with a handle to this unit of work, then commit.
    ///
    /// If `f` fails the transaction is rolled back and `f`'s error returned
    /// (as [`DataError::RollbackFailed`] when the rollback fails too). If `f`
    /// panics the transaction is rolled back before the panic resumes.
    pub async fn run_in_transaction<T, F, Fut>(&self, f: F) -> Result<T, DataError>
    where
        F: FnOnce(UnitOfWork) -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        self.begin().await?;
        let handle = self.clone();
        let outcome = AssertUnwindSafe(async move { f(handle).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) => {
                self.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Transaction body failed, rolling back");
                match self.rollback().await {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(DataError::RollbackFailed {
                        original: Box::new(err),
                        rollback: Box::new(rollback),
                    }),
                }
            }
            Err(panic) => {
                tracing::warn!("Transaction body panicked, rolling back");
                if let Err(rollback) = self.rollback().await {
                    tracing::error!(error = %rollback, "Rollback after panic failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    fn report(&self, operation: Operation, started: Instant, error: Option<&DataError>) {
        self.inner.logger.log(&QueryEvent {
            operation,
            sql: operation_sql(operation),
            args: &[],
            duration: started.elapsed(),
            error,
        });
    }
}

fn operation_sql(operation: Operation) -> &'static str {
    match operation {
        Operation::Begin => "BEGIN",
        Operation::Commit => "COMMIT",
        Operation::Rollback => "ROLLBACK",
        Operation::Execute | Operation::Query => "",
    }
}

pub(crate) fn log_statement(
    logger: &dyn QueryLogger,
    operation: Operation,
    stmt: &Statement,
    started: Instant,
    error: Option<&DataError>,
) {
    logger.log(&QueryEvent {
        operation,
        sql: &stmt.sql,
        args: &stmt.args,
        duration: started.elapsed(),
        error,
    });
}
