use std::sync::Arc;
use std::time::Instant;

use crate::cancel::Cancellation;
use crate::error::DataError;
use crate::executor::{Database, ExecResult};
use crate::log::{Operation, QueryLogger};
use crate::query::{Dialect, IdentifierPolicy, Statement};
use crate::row::Row;
use crate::uow::{log_statement, UnitOfWork};

/// Routing, logging and cancellation shared by a repository and the
/// builders it hands out.
///
/// The routing target is fixed at construction; each call checks it and
/// sends the statement either to the unit of work or to the database.
#[derive(Clone)]
pub(crate) struct Session {
    db: Arc<dyn Database>,
    uow: Option<UnitOfWork>,
    logger: Arc<dyn QueryLogger>,
    cancel: Cancellation,
    pub(crate) policy: IdentifierPolicy,
}

impl Session {
    pub(crate) fn new(db: Arc<dyn Database>, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            db,
            uow: None,
            logger,
            cancel: Cancellation::none(),
            policy: IdentifierPolicy::default(),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    pub(crate) fn unit_of_work(&self) -> Option<&UnitOfWork> {
        self.uow.as_ref()
    }

    pub(crate) fn attach(&self, uow: &UnitOfWork) -> Self {
        Self {
            uow: Some(uow.clone()),
            ..self.clone()
        }
    }

    pub(crate) fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub(crate) fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub(crate) fn with_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DataError> {
        let started = Instant::now();
        let result = self
            .cancel
            .run(async {
                match &self.uow {
                    Some(uow) => uow.execute_unlogged(stmt).await,
                    None => self.db.execute(stmt).await,
                }
            })
            .await;
        log_statement(&*self.logger, Operation::Execute, stmt, started, result.as_ref().err());
        result
    }

    pub(crate) async fn query_many(&self, stmt: &Statement) -> Result<Vec<Row>, DataError> {
        let started = Instant::now();
        let result = self
            .cancel
            .run(async {
                match &self.uow {
                    Some(uow) => uow.query_many_unlogged(stmt).await,
                    None => self.db.query_many(stmt).await,
                }
            })
            .await;
        log_statement(&*self.logger, Operation::Query, stmt, started, result.as_ref().err());
        result
    }

    pub(crate) async fn query_one(&self, stmt: &Statement) -> Result<Option<Row>, DataError> {
        let started = Instant::now();
        let result = self
            .cancel
            .run(async {
                match &self.uow {
                    Some(uow) => uow.query_one_unlogged(stmt).await,
                    None => self.db.query_one(stmt).await,
                }
            })
            .await;
        log_statement(&*self.logger, Operation::Query, stmt, started, result.as_ref().err());
        result
    }
}
