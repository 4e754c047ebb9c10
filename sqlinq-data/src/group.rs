//! Grouped aggregation on top of a [`Queryable`].

use std::collections::HashMap;

use crate::entity::Entity;
use crate::error::DataError;
use crate::expr::{AggregateFn, Cond, Projection, Term};
use crate::query::SelectQuery;
use crate::queryable::{Filterable, QueryState, Queryable};
use crate::row::Row;
use crate::value::{FromValue, Value};

/// Output name for an aggregate over `field`: its last path segment, so
/// `orders.total` projects as `total`.
fn aggregate_alias(field: &str) -> String {
    field.rsplit('.').next().unwrap_or(field).to_string()
}

/// Grouping key: a column, or a SQL expression projected under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Column(String),
    Expr { sql: String, alias: String },
}

impl GroupKey {
    pub fn column(name: impl Into<String>) -> Self {
        GroupKey::Column(name.into())
    }

    /// `GroupKey::expr("strftime('%Y', created_at)", "year")`
    pub fn expr(sql: impl Into<String>, alias: impl Into<String>) -> Self {
        GroupKey::Expr {
            sql: sql.into(),
            alias: alias.into(),
        }
    }

    fn term(&self) -> Term {
        match self {
            GroupKey::Column(c) => Term::Column(c.clone()),
            GroupKey::Expr { sql, .. } => Term::Raw(sql.clone()),
        }
    }

    fn projection(&self) -> Projection {
        match self {
            GroupKey::Column(c) => Projection::column(c.clone()),
            GroupKey::Expr { sql, alias } => Projection::Term {
                term: Term::Raw(sql.clone()),
                alias: Some(alias.clone()),
            },
        }
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Column(name.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(name: String) -> Self {
        GroupKey::Column(name)
    }
}

/// Ordered list of aggregates rendered into one projection.
///
/// ```ignore
/// let totals = AggregateBuilder::new()
///     .count()
///     .sum("amount")
///     .max("amount")
///     .with_alias("largest");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateBuilder {
    items: Vec<(AggregateFn, Option<String>, Option<String>)>,
}

impl AggregateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, function: AggregateFn, field: Option<&str>) -> Self {
        self.items.push((function, field.map(str::to_string), None));
        self
    }

    pub fn count(self) -> Self {
        self.push(AggregateFn::Count, None)
    }

    pub fn count_of(self, field: &str) -> Self {
        self.push(AggregateFn::Count, Some(field))
    }

    pub fn sum(self, field: &str) -> Self {
        self.push(AggregateFn::Sum, Some(field))
    }

    pub fn average(self, field: &str) -> Self {
        self.push(AggregateFn::Avg, Some(field))
    }

    pub fn max(self, field: &str) -> Self {
        self.push(AggregateFn::Max, Some(field))
    }

    pub fn min(self, field: &str) -> Self {
        self.push(AggregateFn::Min, Some(field))
    }

    /// Alias for the most recently added aggregate.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(last) = self.items.last_mut() {
            last.2 = Some(alias.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Projections in insertion order. The alias falls back to the field
    /// name's last segment, or `count` for `COUNT(*)`. Colliding names are left as given.
    pub(crate) fn projections(&self) -> Vec<Projection> {
        self.items
            .iter()
            .map(|(function, field, alias)| {
                let alias = alias
                    .clone()
                    .or_else(|| field.as_deref().map(aggregate_alias))
                    .unwrap_or_else(|| "count".to_string());
                Projection::Aggregate {
                    function: *function,
                    column: field.clone(),
                    alias: Some(alias),
                    coalesce_zero: false,
                }
            })
            .collect()
    }
}

/// A query grouped by one key. Each terminal renders a single statement
/// projecting the key and one aggregate, and maps key to aggregate. Keys
/// with no matching rows do not appear.
pub struct GroupingQuery<T> {
    inner: Queryable<T>,
    key: GroupKey,
}

impl<T: Entity> QueryState for GroupingQuery<T> {
    fn state(&self) -> &SelectQuery {
        &self.inner.query
    }

    fn state_mut(&mut self) -> &mut SelectQuery {
        &mut self.inner.query
    }
}

impl<T: Entity> Filterable for GroupingQuery<T> {}

impl<T: Entity> GroupingQuery<T> {
    pub(crate) fn new(inner: Queryable<T>, key: GroupKey) -> Self {
        Self { inner, key }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Post-aggregation filter.
    pub fn having(mut self, cond: Cond) -> Self {
        self.inner.query.having.push(cond);
        self
    }

    fn grouped(&self, aggregates: Vec<Projection>) -> Queryable<T> {
        let mut q = self.inner.clone();
        q.query.order.clear();
        q.query.group_by = vec![self.key.term()];
        q.query.projection = std::iter::once(self.key.projection())
            .chain(aggregates)
            .collect();
        q
    }

    async fn keyed(&self, aggregate: Projection) -> Result<Vec<(Value, Value)>, DataError> {
        let rows: Vec<Row> = self.grouped(vec![aggregate]).to_result().await?;
        rows.into_iter()
            .map(|row| {
                let mut values = row.into_values().into_iter();
                match (values.next(), values.next()) {
                    (Some(key), Some(aggregate)) => Ok((key, aggregate)),
                    _ => Err(DataError::schema("grouped row must carry a key and an aggregate")),
                }
            })
            .collect()
    }

    pub async fn count(&self) -> Result<HashMap<Value, i64>, DataError> {
        let pairs = self
            .keyed(Projection::aggregate(AggregateFn::Count, None, Some("count")))
            .await?;
        pairs
            .into_iter()
            .map(|(key, n)| Ok((key, i64::from_value(n)?)))
            .collect()
    }

    /// Per-group sum of `field`; an all-NULL group sums to zero.
    pub async fn sum(&self, field: &str) -> Result<HashMap<Value, f64>, DataError> {
        let pairs = self
            .keyed(Projection::Aggregate {
                function: AggregateFn::Sum,
                column: Some(field.to_string()),
                alias: Some(aggregate_alias(field)),
                coalesce_zero: true,
            })
            .await?;
        pairs
            .into_iter()
            .map(|(key, total)| Ok((key, Option::<f64>::from_value(total)?.unwrap_or(0.0))))
            .collect()
    }

    /// Per-group average of `field`. Groups whose values are all NULL are
    /// omitted.
    pub async fn average(&self, field: &str) -> Result<HashMap<Value, f64>, DataError> {
        let pairs = self
            .keyed(Projection::aggregate(AggregateFn::Avg, Some(field), Some(&aggregate_alias(field))))
            .await?;
        let mut averages = HashMap::new();
        for (key, avg) in pairs {
            if let Some(avg) = Option::<f64>::from_value(avg)? {
                averages.insert(key, avg);
            }
        }
        Ok(averages)
    }

    /// A builder projecting the key followed by each aggregate, ready for
    /// `to_map_list` or `to_result::<R>()`.
    pub fn aggregate(self, aggregates: AggregateBuilder) -> Queryable<T> {
        self.grouped(aggregates.projections())
    }

    /// A builder projecting only the key, one row per distinct key.
    pub fn into_queryable(self) -> Queryable<T> {
        self.grouped(Vec::new())
    }
}

/// One group of a multi-key sum: the key values in key order, one sum per
/// requested field and the number of rows in the group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotals {
    pub keys: Vec<Value>,
    pub sums: HashMap<String, f64>,
    pub count: i64,
}

impl<T: Entity> Queryable<T> {
    /// Group by every key at once and sum each field per group, in one
    /// statement:
    /// `SELECT k1, k2, COALESCE(SUM(f), 0) AS f_sum, …, COUNT(*) AS group_count … GROUP BY k1, k2`.
    pub async fn group_sums<K: Into<GroupKey>>(
        &self,
        keys: impl IntoIterator<Item = K>,
        fields: &[&str],
    ) -> Result<Vec<GroupTotals>, DataError> {
        let keys: Vec<GroupKey> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(DataError::configuration("group_sums needs at least one group key"));
        }
        let rows: Vec<Row> = self.group_sums_query(&keys, fields).to_result().await?;
        rows.into_iter()
            .map(|row| {
                let mut values = row.into_values().into_iter();
                let key_values: Vec<Value> = values.by_ref().take(keys.len()).collect();
                if key_values.len() != keys.len() {
                    return Err(DataError::schema("grouped row is missing key columns"));
                }
                let mut sums = HashMap::with_capacity(fields.len());
                for field in fields {
                    let total = values
                        .next()
                        .ok_or_else(|| DataError::schema(format!("grouped row is missing the sum of `{field}`")))?;
                    sums.insert(field.to_string(), Option::<f64>::from_value(total)?.unwrap_or(0.0));
                }
                let count = values
                    .next()
                    .ok_or_else(|| DataError::schema("grouped row is missing its count"))?;
                Ok(GroupTotals {
                    keys: key_values,
                    sums,
                    count: i64::from_value(count)?,
                })
            })
            .collect()
    }

    fn group_sums_query(&self, keys: &[GroupKey], fields: &[&str]) -> Queryable<T> {
        let mut q = self.clone();
        q.query.order.clear();
        q.query.group_by = keys.iter().map(GroupKey::term).collect();
        q.query.projection = keys
            .iter()
            .map(GroupKey::projection)
            .chain(fields.iter().map(|field| Projection::Aggregate {
                function: AggregateFn::Sum,
                column: Some(field.to_string()),
                alias: Some(format!("{}_sum", aggregate_alias(field))),
                coalesce_zero: true,
            }))
            .chain(std::iter::once(Projection::aggregate(
                AggregateFn::Count,
                None,
                Some("group_count"),
            )))
            .collect();
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_alias_fallbacks() {
        let projections = AggregateBuilder::new()
            .count()
            .sum("amount")
            .max("amount")
            .with_alias("largest")
            .projections();
        let aliases: Vec<_> = projections
            .iter()
            .map(|p| match p {
                Projection::Aggregate { alias, .. } => alias.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(
            aliases,
            vec![
                Some("count".to_string()),
                Some("amount".to_string()),
                Some("largest".to_string())
            ]
        );
    }

    #[test]
    fn test_aggregate_alias_drops_table_prefix() {
        assert_eq!(aggregate_alias("orders.total"), "total");
        assert_eq!(aggregate_alias("total"), "total");
        let projections = AggregateBuilder::new().sum("orders.total").projections();
        assert!(matches!(
            &projections[0],
            Projection::Aggregate { alias: Some(alias), .. } if alias == "total"
        ));
    }

    #[test]
    fn test_with_alias_on_empty_builder_is_ignored() {
        assert!(AggregateBuilder::new().with_alias("x").is_empty());
    }

    #[test]
    fn test_expr_key_projects_alias() {
        let key = GroupKey::expr("substr(name, 1, 1)", "initial");
        assert_eq!(key.term(), Term::Raw("substr(name, 1, 1)".into()));
        assert_eq!(
            key.projection(),
            Projection::Term {
                term: Term::Raw("substr(name, 1, 1)".into()),
                alias: Some("initial".into())
            }
        );
    }
}
