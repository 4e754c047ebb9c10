//! Batch mutation planning: window sizing and statement shapes for
//! multi-row INSERT and CASE-keyed UPDATE.
//!
//! Backends cap the number of bound parameters per statement. A window
//! holds at most `safe_batch_size` rows, which keeps a statement under 80%
//! of the budget and leaves room for extra WHERE arguments.

use crate::config::BatchConfig;
use crate::entity::{value_of, Entity};
use crate::error::DataError;
use crate::expr::{col, Cond};
use crate::query::{InsertQuery, SetExpr, UpdateQuery};

/// Rows per statement when the caller does not choose.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Bound parameters per statement assumed for every dialect.
pub const DEFAULT_PARAM_BUDGET: usize = 16384;

/// Largest window whose parameters fit in 80% of `param_budget`.
///
/// `safe_batch_size(10, 16384) == 1310`.
pub fn safe_batch_size(fields_per_row: usize, param_budget: usize) -> usize {
    // floor(budget * 4 / 5) without overflowing on large budgets
    let usable = param_budget / 5 * 4 + param_budget % 5 * 4 / 5;
    usable / fields_per_row.max(1)
}

/// `min(configured, safe)`, rejecting sizes that would make no progress.
pub fn effective_batch_size(configured: usize, fields_per_row: usize, param_budget: usize) -> Result<usize, DataError> {
    if configured == 0 {
        return Err(DataError::configuration("batch size must be at least 1"));
    }
    let safe = safe_batch_size(fields_per_row, param_budget);
    if safe == 0 {
        return Err(DataError::configuration(format!(
            "parameter budget {param_budget} cannot fit one row of {fields_per_row} parameters"
        )));
    }
    Ok(configured.min(safe))
}

/// Consecutive windows of `size` items, each tagged with its offset.
pub(crate) fn windows<T>(items: &[T], size: usize) -> impl Iterator<Item = (usize, &[T])> {
    items
        .chunks(size.max(1))
        .enumerate()
        .map(move |(i, chunk)| (i * size, chunk))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInsertOptions {
    pub batch_size: usize,
    pub param_budget: usize,
}

impl Default for BatchInsertOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            param_budget: DEFAULT_PARAM_BUDGET,
        }
    }
}

impl BatchInsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn param_budget(mut self, param_budget: usize) -> Self {
        self.param_budget = param_budget;
        self
    }
}

impl From<&BatchConfig> for BatchInsertOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            param_budget: config.param_budget,
        }
    }
}

/// Options for [`Repository::batch_update`](crate::Repository::batch_update).
///
/// `update_fields` defaults to every persisted column except the key;
/// `key_field` defaults to the entity's key column.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUpdateOptions {
    pub batch_size: usize,
    pub param_budget: usize,
    pub update_fields: Vec<String>,
    pub key_field: Option<String>,
    pub additional_where: Option<Cond>,
}

impl Default for BatchUpdateOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            param_budget: DEFAULT_PARAM_BUDGET,
            update_fields: Vec::new(),
            key_field: None,
            additional_where: None,
        }
    }
}

impl BatchUpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn param_budget(mut self, param_budget: usize) -> Self {
        self.param_budget = param_budget;
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.update_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    /// Extra condition ANDed onto each window's `key IN (…)` filter.
    pub fn additional_where(mut self, cond: Cond) -> Self {
        self.additional_where = Some(cond);
        self
    }
}

/// Resolved plan for a batch update over one entity type.
#[derive(Debug)]
pub(crate) struct UpdatePlan {
    pub(crate) key: String,
    pub(crate) fields: Vec<String>,
    pub(crate) window: usize,
}

impl UpdatePlan {
    pub(crate) fn resolve<T: Entity>(options: &BatchUpdateOptions) -> Result<Self, DataError> {
        let key = options
            .key_field
            .clone()
            .or_else(|| T::key_column().map(str::to_string))
            .ok_or_else(|| DataError::configuration("key field must be specified for batch update"))?;
        let requested: Vec<String> = if options.update_fields.is_empty() {
            T::columns().iter().map(|c| c.to_string()).collect()
        } else {
            options.update_fields.clone()
        };
        let fields: Vec<String> = requested.into_iter().filter(|f| *f != key).collect();
        if fields.is_empty() {
            return Err(DataError::configuration(format!(
                "batch update of `{}` has no fields besides the key `{key}`",
                T::table_name()
            )));
        }
        let window = effective_batch_size(options.batch_size, fields.len() + 1, options.param_budget)?;
        Ok(Self { key, fields, window })
    }
}

/// One multi-row INSERT for `window`, one placeholder group per entity.
pub(crate) fn insert_statement<T: Entity>(table: &str, window: &[T]) -> InsertQuery {
    InsertQuery::into_table(table, T::insert_columns().iter().copied())
        .rows(window.iter().map(Entity::insert_values))
}

/// `UPDATE table SET f = CASE key WHEN ? THEN ? … END, … WHERE key IN (…)`
/// for one window.
pub(crate) fn update_statement<T: Entity>(
    table: &str,
    plan: &UpdatePlan,
    window: &[T],
    extra: Option<&Cond>,
) -> Result<UpdateQuery, DataError> {
    let keys = window
        .iter()
        .map(|e| value_of(e, &plan.key))
        .collect::<Result<Vec<_>, _>>()?;
    let mut update = UpdateQuery::table(table);
    for field in &plan.fields {
        let arms = keys
            .iter()
            .zip(window)
            .map(|(k, e)| Ok((k.clone(), value_of(e, field)?)))
            .collect::<Result<Vec<_>, DataError>>()?;
        update = update.set(
            field.clone(),
            SetExpr::Case {
                key: plan.key.clone(),
                arms,
            },
        );
    }
    update = update.filter(col(plan.key.clone()).is_in(keys));
    if let Some(extra) = extra {
        update = update.filter(extra.clone());
    }
    Ok(update)
}
