//! The chainable query builder.
//!
//! A [`Queryable`] accumulates a [`SelectQuery`] through the capability
//! traits ([`Filterable`], [`Orderable`], [`Paginate`], [`Projectable`],
//! [`Joinable`]) and executes it through its terminal methods.
//!
//! Terminal methods take `&self` and render from a derived copy of the
//! expression, so a builder can be executed repeatedly and still renders
//! the same statement afterwards.
//!
//! ```ignore
//! let adults = repo
//!     .query()
//!     .filter(col("age").gte(18))
//!     .order_by_raw("age desc, id")
//!     .take(20)
//!     .to_list()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::entity::Entity;
use crate::error::DataError;
use crate::expr::{col, parse_order_spec, AggregateFn, Cond, Join, JoinKind, Order, Projection, Term, Window};
use crate::group::{GroupKey, GroupingQuery};
use crate::page::{page_offset, Page, Pageable};
use crate::query::{SelectQuery, Statement};
use crate::row::{FromRow, Row};
use crate::session::Session;
use crate::value::{FromValue, Value};

/// Access to the expression a builder accumulates.
pub trait QueryState {
    fn state(&self) -> &SelectQuery;

    fn state_mut(&mut self) -> &mut SelectQuery;

    /// Columns projected when a projection must be seeded implicitly.
    fn default_columns(&self) -> &'static [&'static str] {
        &[]
    }
}

pub trait Filterable: QueryState + Sized {
    /// AND-combine `cond` into the filter.
    fn filter(mut self, cond: Cond) -> Self {
        self.state_mut().conditions.push(cond);
        self
    }

    /// AND-combine a literal template; `?` placeholders bind `args` in order.
    fn filter_raw<V: Into<Value>>(self, sql: impl Into<String>, args: impl IntoIterator<Item = V>) -> Self {
        self.filter(Cond::raw(sql, args))
    }

    fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(col(column).eq(value))
    }

    fn where_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(col(column).is_in(values))
    }

    fn where_like(self, column: &str, pattern: &str) -> Self {
        self.filter(col(column).like(pattern))
    }

    fn where_null(self, column: &str) -> Self {
        self.filter(col(column).is_null())
    }

    fn where_not_null(self, column: &str) -> Self {
        self.filter(col(column).is_not_null())
    }
}

pub trait Orderable: QueryState + Sized {
    /// Ascending order on each column.
    fn order_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let order = &mut self.state_mut().order;
        order.extend(columns.into_iter().map(Order::asc));
        self
    }

    fn order_by_desc<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let order = &mut self.state_mut().order;
        order.extend(columns.into_iter().map(Order::desc));
        self
    }

    /// Order by a clause such as `"age desc, id asc"`.
    fn order_by_raw(mut self, spec: &str) -> Self {
        self.state_mut().order.extend(parse_order_spec(spec));
        self
    }
}

pub trait Paginate: QueryState + Sized {
    fn skip(mut self, n: u64) -> Self {
        self.state_mut().offset = Some(n);
        self
    }

    /// Row cap. `take(0)` renders `LIMIT 0` and returns no rows.
    fn take(mut self, n: u64) -> Self {
        self.state_mut().limit = Some(n);
        self
    }

    fn limit(self, n: u64) -> Self {
        self.take(n)
    }
}

pub trait Projectable: QueryState + Sized {
    fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let projection = &mut self.state_mut().projection;
        projection.extend(columns.into_iter().map(Projection::column));
        self
    }

    /// Literal projection expressions, rendered verbatim.
    fn select_raw<S: Into<String>>(mut self, exprs: impl IntoIterator<Item = S>) -> Self {
        let projection = &mut self.state_mut().projection;
        projection.extend(exprs.into_iter().map(Projection::raw));
        self
    }

    fn group_by_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        let group_by = &mut self.state_mut().group_by;
        group_by.extend(columns.into_iter().map(|c| Term::Column(c.into())));
        self
    }

    /// Post-aggregation filter.
    fn having(mut self, cond: Cond) -> Self {
        self.state_mut().having.push(cond);
        self
    }

    /// Append `function() OVER (PARTITION BY …)` to the projection.
    fn over<S: Into<String>>(self, function: &str, partition_by: impl IntoIterator<Item = S>) -> Self {
        self.over_window(Window::new(function).partition_by(partition_by))
    }

    fn over_window(mut self, window: Window) -> Self {
        let seed = self.default_columns();
        let state = self.state_mut();
        if state.projection.is_empty() {
            state.projection = entity_projection(state, seed);
        }
        state.projection.push(Projection::Window(window));
        self
    }
}

pub trait Joinable: QueryState + Sized {
    /// Plain `JOIN` on `local = table.target` for each pair in `on`.
    fn join<L: Into<String>, R: Into<String>>(self, table: &str, on: impl IntoIterator<Item = (L, R)>) -> Self {
        self.push_join(Join::new(JoinKind::Default, table, on))
    }

    fn left_join<L: Into<String>, R: Into<String>>(self, table: &str, on: impl IntoIterator<Item = (L, R)>) -> Self {
        self.push_join(Join::new(JoinKind::Left, table, on))
    }

    fn right_join<L: Into<String>, R: Into<String>>(self, table: &str, on: impl IntoIterator<Item = (L, R)>) -> Self {
        self.push_join(Join::new(JoinKind::Right, table, on))
    }

    fn inner_join<L: Into<String>, R: Into<String>>(self, table: &str, on: impl IntoIterator<Item = (L, R)>) -> Self {
        self.push_join(Join::new(JoinKind::Inner, table, on))
    }

    fn push_join(mut self, join: Join) -> Self {
        self.state_mut().joins.push(join);
        self
    }
}

/// The entity's columns, qualified with the base table when joins could
/// make bare names ambiguous.
pub(crate) fn entity_projection(q: &SelectQuery, columns: &[&str]) -> Vec<Projection> {
    let qualifier = match q.table() {
        Some(table) if !q.joins.is_empty() => Some(table.to_string()),
        _ => None,
    };
    columns
        .iter()
        .map(|c| match &qualifier {
            Some(table) => Projection::column(format!("{table}.{c}")),
            None => Projection::column(*c),
        })
        .collect()
}

pub struct Queryable<T> {
    pub(crate) session: Session,
    pub(crate) query: SelectQuery,
    _entity: PhantomData<fn() -> T>,
}

// Manual impl: `T` itself need not be `Clone`.
impl<T> Clone for Queryable<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            query: self.query.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Queryable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queryable").field("query", &self.query).finish()
    }
}

impl<T: Entity> QueryState for Queryable<T> {
    fn state(&self) -> &SelectQuery {
        &self.query
    }

    fn state_mut(&mut self) -> &mut SelectQuery {
        &mut self.query
    }

    fn default_columns(&self) -> &'static [&'static str] {
        T::columns()
    }
}

impl<T: Entity> Filterable for Queryable<T> {}
impl<T: Entity> Orderable for Queryable<T> {}
impl<T: Entity> Paginate for Queryable<T> {}
impl<T: Entity> Projectable for Queryable<T> {}
impl<T: Entity> Joinable for Queryable<T> {}

impl<T: Entity> Queryable<T> {
    pub(crate) fn new(session: Session, table: &str) -> Self {
        Self {
            session,
            query: SelectQuery::from_table(table),
            _entity: PhantomData,
        }
    }

    fn render(&self, q: &SelectQuery) -> Result<Statement, DataError> {
        Ok(q.render(self.session.dialect(), self.session.policy)?)
    }

    /// The expression with the entity's columns projected if nothing was
    /// selected explicitly.
    fn entity_query(&self) -> SelectQuery {
        let mut q = self.query.clone();
        if q.projection.is_empty() {
            q.projection = entity_projection(&q, T::columns());
        }
        q
    }

    fn count_query(&self) -> SelectQuery {
        let mut base = self.query.clone();
        let count = Projection::aggregate(AggregateFn::Count, None, None);
        if base.limit.is_some() || base.offset.is_some() || !base.group_by.is_empty() {
            if base.projection.is_empty() {
                base.projection = vec![Projection::raw("1")];
            }
            if base.limit.is_none() && base.offset.is_none() {
                base.order.clear();
            }
            SelectQuery::from_subquery(base, "counted").project(count)
        } else {
            base.order.clear();
            base.projection = vec![count];
            base
        }
    }

    fn scalar_query(&self, projection: Projection) -> SelectQuery {
        let mut q = self.query.clone();
        q.order.clear();
        q.projection = vec![projection];
        q
    }

    async fn scalar(&self, q: SelectQuery) -> Result<Value, DataError> {
        let stmt = self.render(&q)?;
        let row = self.session.query_one(&stmt).await?;
        Ok(row
            .and_then(|r| r.into_values().into_iter().next())
            .unwrap_or(Value::Null))
    }

    async fn rows(&self, q: &SelectQuery) -> Result<Vec<Row>, DataError> {
        let stmt = self.render(q)?;
        self.session.query_many(&stmt).await
    }

    /// Statement the entity-returning terminals would issue.
    pub fn to_sql(&self) -> Result<Statement, DataError> {
        self.render(&self.entity_query())
    }

    /// First matching entity, or `None` when nothing matches.
    pub async fn first_or_default(&self) -> Result<Option<T>, DataError> {
        let mut q = self.entity_query();
        q.limit = Some(1);
        let stmt = self.render(&q)?;
        match self.session.query_one(&stmt).await? {
            Some(row) => T::from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    /// First matching entity, or [`DataError::NotFound`].
    pub async fn first(&self) -> Result<T, DataError> {
        self.first_or_default().await?.ok_or_else(|| {
            DataError::NotFound(format!("no `{}` row matched", T::table_name()))
        })
    }

    pub async fn to_list(&self) -> Result<Vec<T>, DataError> {
        let rows = self.rows(&self.entity_query()).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Number of matching rows. Honors LIMIT, OFFSET and grouping by
    /// counting the rows of the derived query.
    pub async fn count(&self) -> Result<u64, DataError> {
        let value = self.scalar(self.count_query()).await?;
        u64::from_value(value)
    }

    pub async fn exists(&self) -> Result<bool, DataError> {
        let mut q = self.query.clone();
        q.projection = vec![Projection::raw("1")];
        q.order.clear();
        q.limit = Some(1);
        let stmt = self.render(&q)?;
        Ok(self.session.query_one(&stmt).await?.is_some())
    }

    pub async fn any(&self, cond: Cond) -> Result<bool, DataError> {
        self.clone().filter(cond).exists().await
    }

    /// Sum of `field`; an empty match sums to zero.
    pub async fn sum(&self, field: &str) -> Result<f64, DataError> {
        let q = self.scalar_query(Projection::Aggregate {
            function: AggregateFn::Sum,
            column: Some(field.to_string()),
            alias: None,
            coalesce_zero: true,
        });
        Ok(Option::<f64>::from_value(self.scalar(q).await?)?.unwrap_or(0.0))
    }

    pub async fn average(&self, field: &str) -> Result<Option<f64>, DataError> {
        let q = self.scalar_query(Projection::aggregate(AggregateFn::Avg, Some(field), None));
        Option::<f64>::from_value(self.scalar(q).await?)
    }

    pub async fn max<V: FromValue>(&self, field: &str) -> Result<Option<V>, DataError> {
        let q = self.scalar_query(Projection::aggregate(AggregateFn::Max, Some(field), None));
        Option::<V>::from_value(self.scalar(q).await?)
    }

    pub async fn min<V: FromValue>(&self, field: &str) -> Result<Option<V>, DataError> {
        let q = self.scalar_query(Projection::aggregate(AggregateFn::Min, Some(field), None));
        Option::<V>::from_value(self.scalar(q).await?)
    }

    /// One page of entities plus the total match count.
    ///
    /// Issues a count and then the windowed query; the two are not atomic.
    /// Any LIMIT/OFFSET already on the builder is replaced by the window.
    pub async fn to_paged_list(&self, page: u64, size: u64, cond: Option<Cond>) -> Result<Page<T>, DataError> {
        let offset = page_offset(page, size)?;
        let mut base = self.clone();
        if let Some(cond) = cond {
            base.query.conditions.push(cond);
        }
        base.query.limit = None;
        base.query.offset = None;
        let total = base.count().await?;
        let items = base.skip(offset).take(size).to_list().await?;
        Ok(Page::new(items, page, size, total))
    }

    pub async fn to_paged_list_with_total(&self, page: u64, size: u64) -> Result<(Vec<T>, u64), DataError> {
        let page = self.to_paged_list(page, size, None).await?;
        Ok((page.items, page.total))
    }

    /// A page materialized as `R`, using the builder's projection (the
    /// entity's columns if none was selected).
    pub async fn to_paged_result<R: FromRow>(&self, page: u64, size: u64) -> Result<Page<R>, DataError> {
        let offset = page_offset(page, size)?;
        let mut base = self.clone();
        base.query.limit = None;
        base.query.offset = None;
        let total = base.count().await?;
        let windowed = base.skip(offset).take(size);
        let rows = windowed.rows(&windowed.entity_query()).await?;
        let items = rows.iter().map(R::from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, page, size, total))
    }

    /// Page described by `pageable`, applying its sort clause first.
    pub async fn to_page(&self, pageable: &Pageable) -> Result<Page<T>, DataError> {
        let mut q = self.clone();
        if let Some(sort) = &pageable.sort {
            q = q.order_by_raw(sort);
        }
        q.to_paged_list(pageable.page, pageable.size, None).await
    }

    /// Materialize, then partition client-side by `key`.
    pub async fn to_lookup<K, F>(&self, key: F) -> Result<HashMap<K, Vec<T>>, DataError>
    where
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        let mut lookup: HashMap<K, Vec<T>> = HashMap::new();
        for entity in self.to_list().await? {
            lookup.entry(key(&entity)).or_default().push(entity);
        }
        Ok(lookup)
    }

    pub fn group_by(self, key: impl Into<GroupKey>) -> GroupingQuery<T> {
        GroupingQuery::new(self, key.into())
    }

    /// First column of the first row. Fails with `NotFound` when no row
    /// matches.
    pub async fn scan_value(&self) -> Result<Value, DataError> {
        let mut q = self.entity_query();
        q.limit = Some(q.limit.map_or(1, |n| n.min(1)));
        let stmt = self.render(&q)?;
        let row = self.session.query_one(&stmt).await?.ok_or_else(|| {
            DataError::NotFound(format!("no `{}` row matched", T::table_name()))
        })?;
        row.into_values()
            .into_iter()
            .next()
            .ok_or_else(|| DataError::schema("result row has no columns"))
    }

    pub async fn scan<V: FromValue>(&self) -> Result<V, DataError> {
        V::from_value(self.scan_value().await?)
    }

    /// First column of every row.
    pub async fn to_vec<V: FromValue>(&self) -> Result<Vec<V>, DataError> {
        let rows = self.rows(&self.entity_query()).await?;
        rows.into_iter()
            .map(|row| row.get_at::<V>(0))
            .collect()
    }

    pub async fn to_map_list(&self) -> Result<Vec<HashMap<String, Value>>, DataError> {
        let rows = self.rows(&self.entity_query()).await?;
        Ok(rows.into_iter().map(Row::into_map).collect())
    }

    pub async fn to_map(&self) -> Result<Option<HashMap<String, Value>>, DataError> {
        let mut q = self.entity_query();
        q.limit = Some(1);
        let stmt = self.render(&q)?;
        Ok(self.session.query_one(&stmt).await?.map(Row::into_map))
    }

    /// Rows materialized as `R` instead of the entity type.
    pub async fn to_result<R: FromRow>(&self) -> Result<Vec<R>, DataError> {
        let rows = self.rows(&self.entity_query()).await?;
        rows.iter().map(R::from_row).collect()
    }

    pub async fn first_as<R: FromRow>(&self) -> Result<Option<R>, DataError> {
        let mut q = self.entity_query();
        q.limit = Some(1);
        let stmt = self.render(&q)?;
        match self.session.query_one(&stmt).await? {
            Some(row) => R::from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}
