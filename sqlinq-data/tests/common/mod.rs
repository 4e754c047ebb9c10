#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlinq_data::{DataError, Database, Dialect, Entity, ExecResult, Row, Statement, TransactionHandle, Value};

#[derive(Debug, Clone, PartialEq, Entity)]
#[entity(table = "users")]
pub struct User {
    #[column(generated)]
    pub id: i64,
    pub name: String,
    pub age: i64,
}

impl User {
    pub fn new(id: i64, name: &str, age: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
        }
    }
}

/// Append-only rows with no key column.
#[derive(Debug, Clone, PartialEq, Entity)]
#[entity(table = "audit_log")]
pub struct AuditEntry {
    pub event: String,
    pub at: i64,
}

#[derive(Debug, Clone, PartialEq, Entity)]
#[entity(table = "flags")]
pub struct Flag {
    #[column(generated)]
    pub id: i8,
    pub name: String,
}

/// A statement as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub sql: String,
    pub args: Vec<Value>,
    pub in_tx: bool,
}

#[derive(Default)]
struct State {
    log: Vec<Recorded>,
    results: VecDeque<Vec<Row>>,
    executes: usize,
    single_row_queries: usize,
    fail_execute_at: Option<usize>,
    fail_rollback: bool,
}

/// In-memory database that records statements and replays queued results.
#[derive(Clone)]
pub struct MockDatabase {
    dialect: Dialect,
    delay: Option<Duration>,
    state: Arc<Mutex<State>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::Generic)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            delay: None,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(&self) -> Arc<dyn Database> {
        Arc::new(self.clone())
    }

    /// The `n`-th (0-based) execute call fails.
    pub fn fail_execute_at(&self, n: usize) {
        self.state.lock().unwrap().fail_execute_at = Some(n);
    }

    pub fn fail_rollback(&self) {
        self.state.lock().unwrap().fail_rollback = true;
    }

    /// Queue the result of the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().results.push_back(rows);
    }

    pub fn push_scalar(&self, column: &str, value: impl Into<Value>) {
        self.push_rows(vec![Row::from_pairs([(column, value.into())])]);
    }

    /// Calls that went through `query_one` rather than `query_many`.
    pub fn single_row_queries(&self) -> usize {
        self.state.lock().unwrap().single_row_queries
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.log().into_iter().map(|r| r.sql).collect()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, sql: &str, args: &[Value], in_tx: bool) {
        self.state.lock().unwrap().log.push(Recorded {
            sql: sql.to_string(),
            args: args.to_vec(),
            in_tx,
        });
    }

    fn run_execute(&self, stmt: &Statement, in_tx: bool) -> Result<ExecResult, DataError> {
        self.record(&stmt.sql, &stmt.args, in_tx);
        let mut state = self.state.lock().unwrap();
        let n = state.executes;
        state.executes += 1;
        if state.fail_execute_at == Some(n) {
            return Err(DataError::execution(std::io::Error::other("injected failure")));
        }
        Ok(ExecResult {
            rows_affected: affected_rows(&stmt.sql),
            last_insert_id: Some(100 + n as i64),
        })
    }

    fn run_query(&self, stmt: &Statement, in_tx: bool) -> Vec<Row> {
        self.record(&stmt.sql, &stmt.args, in_tx);
        self.state.lock().unwrap().results.pop_front().unwrap_or_default()
    }

    fn run_query_one(&self, stmt: &Statement, in_tx: bool) -> Option<Row> {
        self.state.lock().unwrap().single_row_queries += 1;
        self.run_query(stmt, in_tx).into_iter().next()
    }
}

/// One per VALUES group for inserts, one otherwise.
fn affected_rows(sql: &str) -> u64 {
    if sql.starts_with("INSERT") {
        sql.matches("), (").count() as u64 + 1
    } else {
        1
    }
}

#[async_trait]
impl Database for MockDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DataError> {
        self.pause().await;
        self.run_execute(stmt, false)
    }

    async fn query_many(&self, stmt: &Statement) -> Result<Vec<Row>, DataError> {
        self.pause().await;
        Ok(self.run_query(stmt, false))
    }

    async fn query_one(&self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        self.pause().await;
        Ok(self.run_query_one(stmt, false))
    }

    async fn begin(&self) -> Result<Box<dyn TransactionHandle>, DataError> {
        self.record("BEGIN", &[], false);
        Ok(Box::new(MockTransaction { db: self.clone() }))
    }
}

pub struct MockTransaction {
    db: MockDatabase,
}

#[async_trait]
impl TransactionHandle for MockTransaction {
    async fn execute(&mut self, stmt: &Statement) -> Result<ExecResult, DataError> {
        self.db.pause().await;
        self.db.run_execute(stmt, true)
    }

    async fn query_many(&mut self, stmt: &Statement) -> Result<Vec<Row>, DataError> {
        self.db.pause().await;
        Ok(self.db.run_query(stmt, true))
    }

    async fn query_one(&mut self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        self.db.pause().await;
        Ok(self.db.run_query_one(stmt, true))
    }

    async fn commit(self: Box<Self>) -> Result<(), DataError> {
        self.db.record("COMMIT", &[], true);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DataError> {
        self.db.record("ROLLBACK", &[], true);
        if self.db.state.lock().unwrap().fail_rollback {
            return Err(DataError::execution(std::io::Error::other("rollback failed")));
        }
        Ok(())
    }
}

/// A row shaped like a `users` record.
pub fn user_row(id: i64, name: &str, age: i64) -> Row {
    Row::from_pairs([
        ("id", Value::Int(id)),
        ("name", Value::from(name)),
        ("age", Value::Int(age)),
    ])
}
