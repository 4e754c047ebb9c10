//! Expression tree: predicates, ordering, projections, joins.
//!
//! Nothing in here knows about dialects; see [`crate::query`] for rendering.

use std::ops::{BitAnd, BitOr, Not};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }
}

/// A boolean predicate.
///
/// Conditions compose with `&`, `|` and `!`:
///
/// ```ignore
/// let active_adults = col("status").eq(1) & col("age").gte(18);
/// let either = col("role").eq("admin") | col("role").eq("owner");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    /// Column-to-column equality, used by join conditions.
    Columns { left: String, right: String },
    /// Literal SQL with `?` placeholders bound positionally.
    Raw { sql: String, args: Vec<Value> },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
}

impl Cond {
    pub fn raw<V: Into<Value>>(sql: impl Into<String>, args: impl IntoIterator<Item = V>) -> Self {
        Cond::Raw {
            sql: sql.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all(conds: impl IntoIterator<Item = Cond>) -> Self {
        Cond::And(conds.into_iter().collect())
    }

    pub fn any(conds: impl IntoIterator<Item = Cond>) -> Self {
        Cond::Or(conds.into_iter().collect())
    }

    /// Equality on every `(column, value)` pair, AND-combined.
    pub fn matching<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Cond::And(
            pairs
                .into_iter()
                .map(|(k, v)| col(k).eq(v))
                .collect(),
        )
    }

    pub fn and(self, other: Cond) -> Cond {
        match self {
            Cond::And(mut conds) => {
                conds.push(other);
                Cond::And(conds)
            }
            first => Cond::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Cond) -> Cond {
        match self {
            Cond::Or(mut conds) => {
                conds.push(other);
                Cond::Or(conds)
            }
            first => Cond::Or(vec![first, other]),
        }
    }

    /// True when the condition places no restriction (an empty conjunction).
    pub fn is_empty(&self) -> bool {
        match self {
            Cond::And(conds) => conds.iter().all(Cond::is_empty),
            Cond::Raw { sql, .. } => sql.trim().is_empty(),
            _ => false,
        }
    }
}

impl BitAnd for Cond {
    type Output = Cond;

    fn bitand(self, rhs: Cond) -> Cond {
        self.and(rhs)
    }
}

impl BitOr for Cond {
    type Output = Cond;

    fn bitor(self, rhs: Cond) -> Cond {
        self.or(rhs)
    }
}

impl Not for Cond {
    type Output = Cond;

    fn not(self) -> Cond {
        Cond::Not(Box::new(self))
    }
}

/// A column reference, the starting point for most predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

pub fn col(name: impl Into<String>) -> Column {
    Column(name.into())
}

impl Column {
    pub fn name(&self) -> &str {
        &self.0
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Cond {
        Cond::Compare {
            column: self.0,
            op,
            value: value.into(),
        }
    }

    /// Equality. Comparing with NULL renders `IS NULL`.
    pub fn eq(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::NotEq, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Gte, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Lte, value)
    }

    pub fn like(self, pattern: impl Into<Value>) -> Cond {
        self.compare(CompareOp::Like, pattern)
    }

    pub fn not_like(self, pattern: impl Into<Value>) -> Cond {
        self.compare(CompareOp::NotLike, pattern)
    }

    /// Membership. An empty list matches nothing.
    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Cond {
        Cond::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Cond {
        Cond::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(self) -> Cond {
        Cond::Null {
            column: self.0,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Cond {
        Cond::Null {
            column: self.0,
            negated: true,
        }
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Cond {
        Cond::Between {
            column: self.0,
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn eq_col(self, other: impl Into<String>) -> Cond {
        Cond::Columns {
            left: self.0,
            right: other.into(),
        }
    }
}

/// One ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Parse an ordering clause such as `"age desc, id asc"`.
///
/// Segments are split on commas and trimmed; empty segments are skipped.
/// The direction token is case-insensitive and defaults to ascending.
pub fn parse_order_spec(spec: &str) -> Vec<Order> {
    spec.split(',')
        .filter_map(|segment| {
            let mut tokens = segment.split_whitespace();
            let column = tokens.next()?;
            let descending = tokens
                .next()
                .map(|dir| dir.eq_ignore_ascii_case("desc"))
                .unwrap_or(false);
            Some(Order {
                column: column.to_string(),
                descending,
            })
        })
        .collect()
}

/// A column or a literal SQL expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Column(String),
    Raw(String),
}

impl From<&str> for Term {
    fn from(column: &str) -> Self {
        Term::Column(column.to_string())
    }
}

impl From<String> for Term {
    fn from(column: String) -> Self {
        Term::Column(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
        }
    }
}

/// A window-function projection: `FUNC() OVER (PARTITION BY … ORDER BY …)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub(crate) function: String,
    pub(crate) partition_by: Vec<String>,
    pub(crate) order_by: Vec<Order>,
    pub(crate) alias: Option<String>,
}

impl Window {
    /// `function` may be a bare name (`ROW_NUMBER`) or a call (`SUM(amount)`).
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            partition_by: Vec::new(),
            order_by: Vec::new(),
            alias: None,
        }
    }

    pub fn partition_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.partition_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(Order::asc(column));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(Order::desc(column));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Term {
        term: Term,
        alias: Option<String>,
    },
    Aggregate {
        function: AggregateFn,
        /// `None` aggregates over `*`.
        column: Option<String>,
        alias: Option<String>,
        coalesce_zero: bool,
    },
    Window(Window),
}

impl Projection {
    pub fn column(name: impl Into<String>) -> Self {
        Projection::Term {
            term: Term::Column(name.into()),
            alias: None,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Projection::Term {
            term: Term::Raw(sql.into()),
            alias: None,
        }
    }

    pub fn aggregate(function: AggregateFn, column: Option<&str>, alias: Option<&str>) -> Self {
        Projection::Aggregate {
            function,
            column: column.map(str::to_string),
            alias: alias.map(str::to_string),
            coalesce_zero: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Plain `JOIN`, inner join semantics.
    Default,
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            JoinKind::Default => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// A join with equality conditions from local columns to joined-table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) table: String,
    pub(crate) on: Vec<(String, String)>,
}

impl Join {
    pub fn new<L, R>(kind: JoinKind, table: impl Into<String>, on: impl IntoIterator<Item = (L, R)>) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        Self {
            kind,
            table: table.into(),
            on: on.into_iter().map(|(l, r)| (l.into(), r.into())).collect(),
        }
    }

    /// Joined-side column, qualified with the joined table unless already qualified.
    pub(crate) fn qualify(&self, column: &str) -> String {
        if column.contains('.') {
            column.to_string()
        } else {
            format!("{}.{column}", self.table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_spec() {
        let order = parse_order_spec("age desc, id asc");
        assert_eq!(order, vec![Order::desc("age"), Order::asc("id")]);
    }

    #[test]
    fn test_parse_order_spec_skips_empty_segments() {
        let order = parse_order_spec(" , name,,created_at DESC , ");
        assert_eq!(order, vec![Order::asc("name"), Order::desc("created_at")]);
        assert!(parse_order_spec("").is_empty());
    }

    #[test]
    fn test_parse_order_spec_unknown_direction_is_ascending() {
        assert_eq!(parse_order_spec("id sideways"), vec![Order::asc("id")]);
    }

    #[test]
    fn test_cond_combinators_flatten() {
        let c = col("a").eq(1) & col("b").eq(2) & col("c").eq(3);
        match c {
            Cond::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert!(Cond::all([]).is_empty());
        assert!(!Cond::all([col("a").is_null()]).is_empty());
    }
}
