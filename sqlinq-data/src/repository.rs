use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::batch::{self, BatchInsertOptions, BatchUpdateOptions, UpdatePlan};
use crate::cancel::Cancellation;
use crate::config::{BatchConfig, DataConfig};
use crate::entity::{value_of, Entity, EntitySchema};
use crate::error::DataError;
use crate::executor::Database;
use crate::expr::{col, Cond};
use crate::log::{QueryLogger, TracingLogger};
use crate::page::{Page, Pageable};
use crate::query::{Assignments, DeleteQuery, Dialect, SetExpr, Statement, UpdateQuery};
use crate::queryable::{Filterable, Queryable};
use crate::session::Session;
use crate::uow::UnitOfWork;
use crate::value::Value;

/// Read facet of a repository.
///
/// Methods return `impl Future` directly, so the trait needs no boxing macro.
pub trait ReadRepository<T: Entity>: Send + Sync {
    fn query(&self) -> Queryable<T>;
    fn find_by_key(&self, key: Value) -> impl Future<Output = Result<Option<T>, DataError>> + Send;
    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;
    fn find_page(&self, pageable: &Pageable) -> impl Future<Output = Result<Page<T>, DataError>> + Send;
    fn count(&self) -> impl Future<Output = Result<u64, DataError>> + Send;
}

/// Write facet of a repository. Every method returns the affected row count.
pub trait WriteRepository<T: Entity>: Send + Sync {
    fn create(&self, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn update(&self, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn update_by_condition(&self, cond: Cond, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn update_fields_by_condition(
        &self,
        cond: Cond,
        fields: Assignments,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn batch_create(&self, entities: &[T]) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn batch_delete(&self, cond: Cond) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn batch_insert(
        &self,
        entities: &[T],
        options: &BatchInsertOptions,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
    fn batch_update(
        &self,
        entities: &[T],
        options: &BatchUpdateOptions,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
}

/// Typed access to one table.
///
/// A repository is immutable once built. `with_*` methods return a new
/// repository, so attaching a unit of work never affects the original.
/// Every statement is routed, at call time, to the attached unit of
/// work's transaction if there is one and to the database otherwise.
pub struct Repository<T> {
    session: Session,
    table: String,
    batch: BatchConfig,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            table: self.table.clone(),
            batch: self.batch.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table)
            .field("dialect", &self.session.dialect())
            .field("attached", &self.session.unit_of_work().is_some())
            .finish()
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            session: Session::new(db, Arc::new(TracingLogger::default())),
            table: T::table_name().to_string(),
            batch: BatchConfig::default(),
            _entity: PhantomData,
        }
    }

    /// Apply identifier policy, batch defaults and logger settings.
    pub fn with_config(mut self, config: &DataConfig) -> Self {
        self.session = self
            .session
            .with_policy(config.identifier_policy)
            .with_logger(Arc::new(TracingLogger::from_config(&config.logging)));
        self.batch = config.batch.clone();
        self
    }

    /// Target another table with the same shape, e.g. a monthly shard.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.session = self.session.with_logger(logger);
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.session = self.session.with_cancellation(cancel);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let cancel = self.session.cancellation().clone().timeout(timeout);
        self.with_cancellation(cancel)
    }

    pub fn with_deadline(self, deadline: tokio::time::Instant) -> Self {
        let cancel = self.session.cancellation().clone().deadline(deadline);
        self.with_cancellation(cancel)
    }

    /// A repository routing every statement through `uow`.
    pub fn with_unit_of_work(&self, uow: &UnitOfWork) -> Self {
        Self {
            session: self.session.attach(uow),
            ..self.clone()
        }
    }

    pub fn unit_of_work(&self) -> Option<&UnitOfWork> {
        self.session.unit_of_work()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.session.dialect()
    }

    /// Insert options seeded from this repository's batch configuration.
    pub fn insert_options(&self) -> BatchInsertOptions {
        BatchInsertOptions::from(&self.batch)
    }

    /// Update options seeded from this repository's batch configuration.
    pub fn update_options(&self) -> BatchUpdateOptions {
        BatchUpdateOptions::new()
            .batch_size(self.batch.batch_size)
            .param_budget(self.batch.param_budget)
    }

    /// A fresh builder bound to this repository's table and routing.
    pub fn query(&self) -> Queryable<T> {
        Queryable::new(self.session.clone(), &self.table)
    }

    /// The statement an unfiltered `query().to_list()` would issue.
    pub fn to_sql(&self) -> Result<Statement, DataError> {
        self.query().to_sql()
    }

    pub async fn find_by_key(&self, key: impl Into<Value>) -> Result<Option<T>, DataError> {
        let column = EntitySchema::of::<T>()?.require_key("find_by_key")?;
        self.query().where_eq(column, key).first_or_default().await
    }

    pub async fn find_all(&self) -> Result<Vec<T>, DataError> {
        self.query().to_list().await
    }

    pub async fn find_page(&self, pageable: &Pageable) -> Result<Page<T>, DataError> {
        self.query().to_page(pageable).await
    }

    pub async fn count(&self) -> Result<u64, DataError> {
        self.query().count().await
    }

    /// The first entity matching `cond`, if any.
    pub async fn query_single(&self, cond: Cond) -> Result<Option<T>, DataError> {
        self.query().filter(cond).first_or_default().await
    }

    pub async fn create(&self, entity: &T) -> Result<u64, DataError> {
        EntitySchema::of::<T>()?;
        let stmt = self.render_insert(std::slice::from_ref(entity))?;
        Ok(self.session.execute(&stmt).await?.rows_affected)
    }

    /// Insert `entity`, store the database-assigned key on it and return
    /// the key. Postgres reads it back with `RETURNING`; other dialects use
    /// the driver's last insert id. A key that does not fit the entity's key
    /// field is a [`DataError::Schema`]; the row is inserted regardless.
    pub async fn create_returning_id(&self, entity: &mut T) -> Result<i64, DataError> {
        let key = EntitySchema::of::<T>()?.require_key("create_returning_id")?;
        let mut insert = batch::insert_statement(&self.table, std::slice::from_ref(&*entity));
        let dialect = self.session.dialect();
        let id = if dialect.uses_returning() {
            insert = insert.returning(key);
            let stmt = insert.render(dialect, self.session.policy)?;
            let row = self
                .session
                .query_one(&stmt)
                .await?
                .ok_or_else(|| DataError::schema("INSERT … RETURNING produced no row"))?;
            row.get_at::<i64>(0)?
        } else {
            let stmt = insert.render(dialect, self.session.policy)?;
            self.session
                .execute(&stmt)
                .await?
                .last_insert_id
                .ok_or_else(|| DataError::schema("backend reported no generated key"))?
        };
        entity.set_generated_key(id)?;
        Ok(id)
    }

    /// Write every non-key column of `entity` to the row with its key.
    pub async fn update(&self, entity: &T) -> Result<u64, DataError> {
        let key = EntitySchema::of::<T>()?.require_key("update")?;
        let cond = col(key).eq(value_of(entity, key)?);
        self.execute_update(self.entity_update(entity, key)?.filter(cond)).await
    }

    /// Write every non-key column of `entity` to all rows matching `cond`.
    pub async fn update_by_condition(&self, cond: Cond, entity: &T) -> Result<u64, DataError> {
        guard_condition(&cond, "update_by_condition")?;
        let schema = EntitySchema::of::<T>()?;
        let key = schema.key.unwrap_or_default();
        self.execute_update(self.entity_update(entity, key)?.filter(cond)).await
    }

    pub async fn update_fields_by_condition(&self, cond: Cond, fields: Assignments) -> Result<u64, DataError> {
        guard_condition(&cond, "update_fields_by_condition")?;
        self.execute_update(UpdateQuery::table(&self.table).assignments(fields).filter(cond))
            .await
    }

    pub async fn update_fields_by_id(&self, id: impl Into<Value>, fields: Assignments) -> Result<u64, DataError> {
        let key = EntitySchema::of::<T>()?.require_key("update_fields_by_id")?;
        self.update_fields_by_condition(col(key).eq(id), fields).await
    }

    /// No-op returning 0 when `ids` is empty.
    pub async fn update_fields_by_ids<V: Into<Value>>(
        &self,
        ids: impl IntoIterator<Item = V>,
        fields: Assignments,
    ) -> Result<u64, DataError> {
        let key = EntitySchema::of::<T>()?.require_key("update_fields_by_ids")?;
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.update_fields_by_condition(col(key).is_in(ids), fields).await
    }

    /// Insert all of `entities` in a single statement.
    pub async fn batch_create(&self, entities: &[T]) -> Result<u64, DataError> {
        if entities.is_empty() {
            return Ok(0);
        }
        EntitySchema::of::<T>()?;
        let stmt = self.render_insert(entities)?;
        Ok(self.session.execute(&stmt).await?.rows_affected)
    }

    pub async fn batch_delete(&self, cond: Cond) -> Result<u64, DataError> {
        guard_condition(&cond, "batch_delete")?;
        let stmt = DeleteQuery::from_table(&self.table)
            .filter(cond)
            .render(self.session.dialect(), self.session.policy)?;
        Ok(self.session.execute(&stmt).await?.rows_affected)
    }

    /// Insert `entities` in sequential windows of at most
    /// `min(batch_size, safe_batch_size)` rows. Stops at the first failing
    /// window; its offset is reported by [`DataError::batch_offset`].
    pub async fn batch_insert(&self, entities: &[T], options: &BatchInsertOptions) -> Result<u64, DataError> {
        if entities.is_empty() {
            return Ok(0);
        }
        let schema = EntitySchema::of::<T>()?;
        let size = batch::effective_batch_size(
            options.batch_size,
            schema.insert_columns.len(),
            options.param_budget,
        )?;
        tracing::debug!(table = %self.table, rows = entities.len(), window = size, "Batch insert");
        let mut affected = 0;
        for (offset, window) in batch::windows(entities, size) {
            let stmt = self.render_insert(window)?;
            let result = self
                .session
                .execute(&stmt)
                .await
                .map_err(|e| e.at_offset(offset))?;
            affected += result.rows_affected;
        }
        Ok(affected)
    }

    /// Update `entities` with one CASE-keyed statement per window:
    /// `SET f = CASE key WHEN ? THEN ? … END, … WHERE key IN (…)`.
    pub async fn batch_update(&self, entities: &[T], options: &BatchUpdateOptions) -> Result<u64, DataError> {
        if entities.is_empty() {
            return Ok(0);
        }
        EntitySchema::of::<T>()?;
        let plan = UpdatePlan::resolve::<T>(options)?;
        tracing::debug!(
            table = %self.table,
            rows = entities.len(),
            window = plan.window,
            key = %plan.key,
            "Batch update"
        );
        let mut affected = 0;
        for (offset, window) in batch::windows(entities, plan.window) {
            let stmt = batch::update_statement(&self.table, &plan, window, options.additional_where.as_ref())?
                .render(self.session.dialect(), self.session.policy)?;
            let result = self
                .session
                .execute(&stmt)
                .await
                .map_err(|e| e.at_offset(offset))?;
            affected += result.rows_affected;
        }
        Ok(affected)
    }

    fn render_insert(&self, entities: &[T]) -> Result<Statement, DataError> {
        Ok(batch::insert_statement(&self.table, entities).render(self.session.dialect(), self.session.policy)?)
    }

    /// SET every insertable column except `key`.
    fn entity_update(&self, entity: &T, key: &str) -> Result<UpdateQuery, DataError> {
        let mut update = UpdateQuery::table(&self.table);
        for column in T::insert_columns().iter().filter(|c| **c != key) {
            update = update.set(*column, SetExpr::Value(value_of(entity, column)?));
        }
        Ok(update)
    }

    async fn execute_update(&self, update: UpdateQuery) -> Result<u64, DataError> {
        let stmt = update.render(self.session.dialect(), self.session.policy)?;
        Ok(self.session.execute(&stmt).await?.rows_affected)
    }
}

/// Mass mutation guard.
fn guard_condition(cond: &Cond, operation: &str) -> Result<(), DataError> {
    if cond.is_empty() {
        return Err(DataError::configuration(format!(
            "{operation} refuses an empty condition"
        )));
    }
    Ok(())
}

impl<T: Entity> ReadRepository<T> for Repository<T> {
    fn query(&self) -> Queryable<T> {
        Repository::query(self)
    }

    fn find_by_key(&self, key: Value) -> impl Future<Output = Result<Option<T>, DataError>> + Send {
        Repository::find_by_key(self, key)
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, DataError>> + Send {
        Repository::find_all(self)
    }

    fn find_page(&self, pageable: &Pageable) -> impl Future<Output = Result<Page<T>, DataError>> + Send {
        Repository::find_page(self, pageable)
    }

    fn count(&self) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::count(self)
    }
}

impl<T: Entity> WriteRepository<T> for Repository<T> {
    fn create(&self, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::create(self, entity)
    }

    fn update(&self, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::update(self, entity)
    }

    fn update_by_condition(&self, cond: Cond, entity: &T) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::update_by_condition(self, cond, entity)
    }

    fn update_fields_by_condition(
        &self,
        cond: Cond,
        fields: Assignments,
    ) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::update_fields_by_condition(self, cond, fields)
    }

    fn batch_create(&self, entities: &[T]) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::batch_create(self, entities)
    }

    fn batch_delete(&self, cond: Cond) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::batch_delete(self, cond)
    }

    fn batch_insert(
        &self,
        entities: &[T],
        options: &BatchInsertOptions,
    ) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::batch_insert(self, entities, options)
    }

    fn batch_update(
        &self,
        entities: &[T],
        options: &BatchUpdateOptions,
    ) -> impl Future<Output = Result<u64, DataError>> + Send {
        Repository::batch_update(self, entities, options)
    }
}
