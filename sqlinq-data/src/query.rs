//! Statement trees and their rendering to parameterized SQL.
//!
//! Rendering is a pure function of the tree, the [`Dialect`] and the
//! [`IdentifierPolicy`]: the same inputs always produce the same
//! [`Statement`].
//!
//! ```ignore
//! let stmt = SelectQuery::from_table("users")
//!     .filter(col("status").eq("active"))
//!     .order(Order::asc("id"))
//!     .limit(10)
//!     .render(Dialect::Postgres, IdentifierPolicy::Validate)?;
//! assert_eq!(stmt.sql, "SELECT * FROM users WHERE status = $1 ORDER BY id ASC LIMIT 10");
//! ```

use serde::{Deserialize, Serialize};

use crate::expr::{AggregateFn, CompareOp, Cond, Join, Order, Projection, Term, Window};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    #[default]
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// StarRocks speaks the MySQL protocol and renders as [`Dialect::MySql`].
    StarRocks,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql | Dialect::StarRocks => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql | Dialect::StarRocks => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Whether generated keys come back through `RETURNING` rather than
    /// the driver's last-insert-id.
    pub fn uses_returning(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// LIMIT value rendered when only an OFFSET was requested, for
    /// dialects that cannot express OFFSET on its own.
    fn unbounded_limit(self) -> Option<&'static str> {
        match self {
            Dialect::Sqlite => Some("-1"),
            Dialect::MySql | Dialect::StarRocks => Some("18446744073709551615"),
            Dialect::Generic | Dialect::Postgres => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    #[default]
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// A rendered, parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

#[derive(Debug, Clone)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// A raw template's `?` count does not match its argument count.
    ArgumentCount { sql: String, expected: usize, got: usize },
    /// An insert row does not have one value per column.
    RowArity { expected: usize, got: usize },
    EmptyInsert,
    EmptyUpdate,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::ArgumentCount { sql, expected, got } => {
                write!(f, "`{sql}` has {expected} placeholders but {got} arguments")
            }
            QueryError::RowArity { expected, got } => {
                write!(f, "insert row has {got} values for {expected} columns")
            }
            QueryError::EmptyInsert => f.write_str("insert without rows"),
            QueryError::EmptyUpdate => f.write_str("update without assignments"),
        }
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Source {
    Table(String),
    Subquery(Box<SelectQuery>, String),
}

/// An accumulating SELECT expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub(crate) source: Source,
    pub(crate) projection: Vec<Projection>,
    pub(crate) joins: Vec<Join>,
    pub(crate) conditions: Vec<Cond>,
    pub(crate) group_by: Vec<Term>,
    pub(crate) having: Vec<Cond>,
    pub(crate) order: Vec<Order>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl SelectQuery {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::from_source(Source::Table(table.into()))
    }

    pub(crate) fn from_source(source: Source) -> Self {
        Self {
            source,
            projection: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Wrap `inner` as `SELECT … FROM (inner) AS alias`.
    pub fn from_subquery(inner: SelectQuery, alias: impl Into<String>) -> Self {
        Self::from_source(Source::Subquery(Box::new(inner), alias.into()))
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection.push(projection);
        self
    }

    pub fn filter(mut self, cond: Cond) -> Self {
        self.conditions.push(cond);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn group(mut self, term: Term) -> Self {
        self.group_by.push(term);
        self
    }

    pub fn having(mut self, cond: Cond) -> Self {
        self.having.push(cond);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn table(&self) -> Option<&str> {
        match &self.source {
            Source::Table(t) => Some(t),
            Source::Subquery(..) => None,
        }
    }

    pub fn render(&self, dialect: Dialect, policy: IdentifierPolicy) -> Result<Statement, QueryError> {
        let mut r = Renderer::new(dialect, policy);
        r.select(self)?;
        Ok(r.finish())
    }
}

/// Multi-row INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<Value>>,
    pub(crate) returning: Option<String>,
}

impl InsertQuery {
    pub fn into_table<S: Into<String>>(table: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            returning: None,
        }
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.returning = Some(column.into());
        self
    }

    pub fn render(&self, dialect: Dialect, policy: IdentifierPolicy) -> Result<Statement, QueryError> {
        let mut r = Renderer::new(dialect, policy);
        r.insert(self)?;
        Ok(r.finish())
    }
}

/// Right-hand side of a SET assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Value(Value),
    /// Literal expression with `?` placeholders, e.g. `version + ?`.
    Raw { sql: String, args: Vec<Value> },
    /// `CASE key WHEN k THEN v … END`.
    Case { key: String, arms: Vec<(Value, Value)> },
}

/// An ordered list of column assignments for UPDATE statements.
///
/// ```ignore
/// let changes = Assignments::new()
///     .set("status", 2)
///     .set_raw("version", "version + ?", [1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignments(pub(crate) Vec<(String, SetExpr)>);

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((column.into(), SetExpr::Value(value.into())));
        self
    }

    pub fn set_raw<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = V>,
    ) -> Self {
        self.0.push((
            column.into(),
            SetExpr::Raw {
                sql: sql.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Assignments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), SetExpr::Value(v.into())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub(crate) table: String,
    pub(crate) sets: Vec<(String, SetExpr)>,
    pub(crate) conditions: Vec<Cond>,
}

impl UpdateQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sets: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, expr: SetExpr) -> Self {
        self.sets.push((column.into(), expr));
        self
    }

    pub fn assignments(mut self, assignments: Assignments) -> Self {
        self.sets.extend(assignments.0);
        self
    }

    pub fn filter(mut self, cond: Cond) -> Self {
        self.conditions.push(cond);
        self
    }

    pub fn render(&self, dialect: Dialect, policy: IdentifierPolicy) -> Result<Statement, QueryError> {
        let mut r = Renderer::new(dialect, policy);
        r.update(self)?;
        Ok(r.finish())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub(crate) table: String,
    pub(crate) conditions: Vec<Cond>,
}

impl DeleteQuery {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    pub fn filter(mut self, cond: Cond) -> Self {
        self.conditions.push(cond);
        self
    }

    pub fn render(&self, dialect: Dialect, policy: IdentifierPolicy) -> Result<Statement, QueryError> {
        let mut r = Renderer::new(dialect, policy);
        r.delete(self)?;
        Ok(r.finish())
    }
}

struct Renderer {
    dialect: Dialect,
    policy: IdentifierPolicy,
    sql: String,
    args: Vec<Value>,
}

impl Renderer {
    fn new(dialect: Dialect, policy: IdentifierPolicy) -> Self {
        Self {
            dialect,
            policy,
            sql: String::new(),
            args: Vec::new(),
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            args: self.args,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: Value) {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.sql.push_str(&placeholder);
    }

    fn ident(&mut self, ident: &str, allow_star: bool, kind: &'static str) -> Result<(), QueryError> {
        let formatted = self.format_identifier(ident, allow_star, kind)?;
        self.sql.push_str(&formatted);
        Ok(())
    }

    fn format_identifier(&self, ident: &str, allow_star: bool, kind: &'static str) -> Result<String, QueryError> {
        if self.policy == IdentifierPolicy::Raw {
            return Ok(ident.to_string());
        }
        let segments = split_identifier(ident, allow_star).ok_or_else(|| QueryError::InvalidIdentifier {
            kind,
            ident: ident.to_string(),
        })?;
        if self.policy != IdentifierPolicy::Quote {
            return Ok(ident.to_string());
        }
        let q = self.dialect.quote_char();
        let quoted: Vec<String> = segments
            .into_iter()
            .map(|segment| match segment {
                "*" => segment.to_string(),
                name => format!("{q}{name}{q}"),
            })
            .collect();
        Ok(quoted.join("."))
    }

    /// Copy a literal template, replacing `?` outside string literals with
    /// dialect placeholders bound to `args` in order.
    fn template(&mut self, sql: &str, args: &[Value]) -> Result<(), QueryError> {
        let expected = count_placeholders(sql);
        if expected != args.len() {
            return Err(QueryError::ArgumentCount {
                sql: sql.to_string(),
                expected,
                got: args.len(),
            });
        }
        let mut args = args.iter();
        let mut in_literal = false;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    self.sql.push(ch);
                }
                '?' if !in_literal => {
                    if let Some(arg) = args.next() {
                        self.bind(arg.clone());
                    }
                }
                _ => self.sql.push(ch),
            }
        }
        Ok(())
    }

    fn alias(&mut self, alias: &Option<String>) -> Result<(), QueryError> {
        if let Some(alias) = alias {
            self.push(" AS ");
            self.ident(alias, false, "alias")?;
        }
        Ok(())
    }

    fn term(&mut self, term: &Term, allow_star: bool) -> Result<(), QueryError> {
        match term {
            Term::Column(c) => self.ident(c, allow_star, "column"),
            Term::Raw(sql) => {
                self.push(sql);
                Ok(())
            }
        }
    }

    fn projection(&mut self, projection: &Projection) -> Result<(), QueryError> {
        match projection {
            Projection::Term { term, alias } => {
                self.term(term, true)?;
                self.alias(alias)
            }
            Projection::Aggregate {
                function,
                column,
                alias,
                coalesce_zero,
            } => {
                let arg = match column {
                    Some(c) => self.format_identifier(c, true, "column")?,
                    None => "*".to_string(),
                };
                let mut expr = format!("{}({arg})", function.sql());
                if *coalesce_zero {
                    expr = format!("COALESCE({expr}, 0)");
                }
                // NUMERIC results cannot be decoded as floats without extra
                // driver features.
                if self.dialect == Dialect::Postgres && matches!(function, AggregateFn::Sum | AggregateFn::Avg) {
                    expr = format!("CAST({expr} AS DOUBLE PRECISION)");
                }
                self.push(&expr);
                self.alias(alias)
            }
            Projection::Window(window) => self.window(window),
        }
    }

    fn window(&mut self, window: &Window) -> Result<(), QueryError> {
        self.push(&window.function);
        if !window.function.contains('(') {
            self.push("()");
        }
        self.push(" OVER (");
        if !window.partition_by.is_empty() {
            self.push("PARTITION BY ");
            for (i, c) in window.partition_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.ident(c, false, "column")?;
            }
        }
        if !window.order_by.is_empty() {
            if !window.partition_by.is_empty() {
                self.push(" ");
            }
            self.push("ORDER BY ");
            self.order_list(&window.order_by)?;
        }
        self.push(")");
        self.alias(&window.alias)
    }

    fn order_list(&mut self, order: &[Order]) -> Result<(), QueryError> {
        for (i, o) in order.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(&o.column, false, "column")?;
            self.push(if o.descending { " DESC" } else { " ASC" });
        }
        Ok(())
    }

    fn cond(&mut self, cond: &Cond) -> Result<(), QueryError> {
        match cond {
            Cond::Compare { column, op, value } => {
                self.ident(column, false, "column")?;
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => self.push(" IS NULL"),
                    (CompareOp::NotEq, Value::Null) => self.push(" IS NOT NULL"),
                    _ => {
                        self.push(" ");
                        self.push(op.sql());
                        self.push(" ");
                        self.bind(value.clone());
                    }
                }
            }
            Cond::In { column, values, negated } => {
                if values.is_empty() {
                    self.push(if *negated { "1 = 1" } else { "1 = 0" });
                    return Ok(());
                }
                self.ident(column, false, "column")?;
                self.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(v.clone());
                }
                self.push(")");
            }
            Cond::Null { column, negated } => {
                self.ident(column, false, "column")?;
                self.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Cond::Between { column, low, high } => {
                self.ident(column, false, "column")?;
                self.push(" BETWEEN ");
                self.bind(low.clone());
                self.push(" AND ");
                self.bind(high.clone());
            }
            Cond::Columns { left, right } => {
                self.ident(left, false, "column")?;
                self.push(" = ");
                self.ident(right, false, "column")?;
            }
            Cond::Raw { sql, args } => self.template(sql, args)?,
            Cond::And(conds) => self.junction(conds, true)?,
            Cond::Or(conds) => self.junction(conds, false)?,
            Cond::Not(inner) => {
                self.push("NOT (");
                self.cond(inner)?;
                self.push(")");
            }
        }
        Ok(())
    }

    fn junction(&mut self, conds: &[Cond], conjunction: bool) -> Result<(), QueryError> {
        let mut parts = Vec::new();
        flatten(conds, conjunction, &mut parts);
        if parts.is_empty() {
            self.push(if conjunction { "1 = 1" } else { "1 = 0" });
            return Ok(());
        }
        let grouped = parts.len() > 1;
        for (i, c) in parts.iter().enumerate() {
            if i > 0 {
                self.push(if conjunction { " AND " } else { " OR " });
            }
            // Nested junctions and raw fragments are parenthesized so the
            // surrounding operator keeps its precedence.
            let wrap = grouped && matches!(c, Cond::And(_) | Cond::Or(_) | Cond::Raw { .. });
            if wrap {
                self.push("(");
            }
            self.cond(c)?;
            if wrap {
                self.push(")");
            }
        }
        Ok(())
    }

    fn clause(&mut self, keyword: &str, conds: &[Cond]) -> Result<(), QueryError> {
        if conds.iter().all(Cond::is_empty) {
            return Ok(());
        }
        self.push(keyword);
        self.junction(conds, true)
    }

    fn select(&mut self, q: &SelectQuery) -> Result<(), QueryError> {
        self.push("SELECT ");
        if q.projection.is_empty() {
            self.push("*");
        }
        for (i, p) in q.projection.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.projection(p)?;
        }
        self.push(" FROM ");
        match &q.source {
            Source::Table(table) => self.ident(table, false, "table")?,
            Source::Subquery(inner, alias) => {
                self.push("(");
                self.select(inner)?;
                self.push(") AS ");
                self.ident(alias, false, "alias")?;
            }
        }
        for join in &q.joins {
            self.push(" ");
            self.push(join.kind.sql());
            self.push(" ");
            self.ident(&join.table, false, "table")?;
            self.push(" ON ");
            for (i, (local, target)) in join.on.iter().enumerate() {
                if i > 0 {
                    self.push(" AND ");
                }
                self.ident(local, false, "column")?;
                self.push(" = ");
                let qualified = join.qualify(target);
                self.ident(&qualified, false, "column")?;
            }
        }
        self.clause(" WHERE ", &q.conditions)?;
        if !q.group_by.is_empty() {
            self.push(" GROUP BY ");
            for (i, t) in q.group_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.term(t, false)?;
            }
        }
        self.clause(" HAVING ", &q.having)?;
        if !q.order.is_empty() {
            self.push(" ORDER BY ");
            self.order_list(&q.order)?;
        }
        match (q.limit, q.offset) {
            (Some(limit), offset) => {
                self.push(&format!(" LIMIT {limit}"));
                if let Some(offset) = offset {
                    self.push(&format!(" OFFSET {offset}"));
                }
            }
            (None, Some(offset)) => {
                if let Some(unbounded) = self.dialect.unbounded_limit() {
                    self.push(&format!(" LIMIT {unbounded}"));
                }
                self.push(&format!(" OFFSET {offset}"));
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn insert(&mut self, q: &InsertQuery) -> Result<(), QueryError> {
        if q.rows.is_empty() {
            return Err(QueryError::EmptyInsert);
        }
        self.push("INSERT INTO ");
        self.ident(&q.table, false, "table")?;
        self.push(" (");
        for (i, c) in q.columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(c, false, "column")?;
        }
        self.push(") VALUES ");
        for (i, row) in q.rows.iter().enumerate() {
            if row.len() != q.columns.len() {
                return Err(QueryError::RowArity {
                    expected: q.columns.len(),
                    got: row.len(),
                });
            }
            if i > 0 {
                self.push(", ");
            }
            self.push("(");
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    self.push(", ");
                }
                self.bind(v.clone());
            }
            self.push(")");
        }
        if let Some(returning) = &q.returning {
            self.push(" RETURNING ");
            self.ident(returning, false, "column")?;
        }
        Ok(())
    }

    fn update(&mut self, q: &UpdateQuery) -> Result<(), QueryError> {
        if q.sets.is_empty() {
            return Err(QueryError::EmptyUpdate);
        }
        self.push("UPDATE ");
        self.ident(&q.table, false, "table")?;
        self.push(" SET ");
        for (i, (column, expr)) in q.sets.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(column, false, "column")?;
            self.push(" = ");
            match expr {
                SetExpr::Value(v) => self.bind(v.clone()),
                SetExpr::Raw { sql, args } => self.template(sql, args)?,
                SetExpr::Case { key, arms } => {
                    self.push("CASE ");
                    self.ident(key, false, "column")?;
                    for (k, v) in arms {
                        self.push(" WHEN ");
                        self.bind(k.clone());
                        self.push(" THEN ");
                        self.bind(v.clone());
                    }
                    self.push(" END");
                }
            }
        }
        self.clause(" WHERE ", &q.conditions)
    }

    fn delete(&mut self, q: &DeleteQuery) -> Result<(), QueryError> {
        self.push("DELETE FROM ");
        self.ident(&q.table, false, "table")?;
        self.clause(" WHERE ", &q.conditions)
    }
}

/// Collect the operands of a junction, inlining nested junctions of the
/// same kind and dropping empty conjunctions.
fn flatten<'a>(conds: &'a [Cond], conjunction: bool, out: &mut Vec<&'a Cond>) {
    for c in conds {
        match c {
            Cond::And(inner) if conjunction => flatten(inner, conjunction, out),
            Cond::Or(inner) if !conjunction => flatten(inner, conjunction, out),
            c if c.is_empty() => {}
            c => out.push(c),
        }
    }
}

fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut count = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

/// Segments of a dotted name such as `orders.total` or `orders.*`. `None`
/// unless every segment is a plain SQL name; `*` is accepted only as the
/// last segment and only when `allow_star` is set.
fn split_identifier(ident: &str, allow_star: bool) -> Option<Vec<&str>> {
    let segments: Vec<&str> = ident.split('.').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .all(|(i, segment)| (allow_star && i == last && *segment == "*") || is_plain_name(segment))
        .then_some(segments)
}

fn is_plain_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    matches!(bytes.first(), Some(b) if b.is_ascii_alphabetic() || *b == b'_')
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}
