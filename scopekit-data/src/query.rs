use chrono::{DateTime, Utc};

use crate::entity::Entity;
use crate::value::Value;

/// Largest LIMIT/OFFSET the engines accept (a signed 64-bit integer).
pub const MAX_ROW_BOUND: u64 = i64::MAX as u64;

/// SQL flavour a [`QueryBuilder`] renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite: `?` placeholders, no row-level locking.
    Sqlite,
    /// Postgres: `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// SQLite locks the whole database for a write transaction and has no
    /// `FOR UPDATE` clause.
    pub fn supports_row_locking(self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }
}

/// A fluent query builder for the statements a repository issues.
///
/// Conditions are conjunctive and rendered in the order they were added.
/// A builder created with [`QueryBuilder::for_entity`] knows the entity's
/// primary key, projection and soft-delete column; rows carrying a deletion
/// marker are hidden unless [`QueryBuilder::unscoped`] is called.
///
/// # Example
///
/// ```ignore
/// let (sql, params) = QueryBuilder::new("users")
///     .where_eq("email", "a@b.com")
///     .where_like("name", "%alice%")
///     .order_by("id", true)
///     .limit(10)
///     .build_select()?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    primary_key: Option<String>,
    soft_delete: Option<String>,
    columns: Vec<String>,
    select: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<Order>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    unscoped: bool,
    only_deleted: bool,
    lock_for_update: bool,
    dialect: Dialect,
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, Value),
    NotEq(String, Value),
    Like(String, Value),
    Gt(String, Value),
    Lt(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
    Raw(String, Vec<Value>),
    Never,
}

#[derive(Debug, Clone)]
enum Order {
    Column(String, bool),
    Raw(String),
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            primary_key: None,
            soft_delete: None,
            columns: Vec::new(),
            select: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            unscoped: false,
            only_deleted: false,
            lock_for_update: false,
            dialect: Dialect::Generic,
        }
    }

    /// Create a builder bound to an entity's table, key, columns and
    /// soft-delete column.
    pub fn for_entity<T: Entity>() -> Self {
        let mut builder = Self::new(T::table_name());
        builder.primary_key = Some(T::id_column().to_string());
        builder.soft_delete = T::soft_delete_column().map(str::to_string);
        builder.columns = T::columns().iter().map(|c| c.to_string()).collect();
        builder
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style and locking).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn where_not_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::NotEq(column.to_string(), value.into()));
        self
    }

    pub fn where_like(mut self, column: &str, pattern: &str) -> Self {
        self.conditions
            .push(Condition::Like(column.to_string(), pattern.into()));
        self
    }

    pub fn where_gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Gt(column.to_string(), value.into()));
        self
    }

    pub fn where_lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Lt(column.to_string(), value.into()));
        self
    }

    /// `column IN (...)`. An empty list matches no rows.
    pub fn where_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNotNull(column.to_string()));
        self
    }

    /// Raw predicate with `?` placeholders, rewritten for the dialect.
    ///
    /// `?` inside single-quoted literals is left alone.
    pub fn filter(mut self, predicate: &str, args: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::Raw(predicate.to_string(), args));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order::Column(column.to_string(), ascending));
        self
    }

    /// Raw ordering expression such as `"age DESC, name"`.
    pub fn order_raw(mut self, expression: &str) -> Self {
        self.order.push(Order::Raw(expression.to_string()));
        self
    }

    /// Restrict the projection. Replaces any earlier selection.
    pub fn select<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.select = columns
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Disable the soft-delete visibility filter.
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    /// Disable the soft-delete visibility filter and keep only rows that
    /// carry a deletion marker.
    pub fn only_deleted(mut self) -> Self {
        self.unscoped = true;
        self.only_deleted = true;
        self
    }

    /// Append an exclusive row lock (`FOR UPDATE`) to SELECT statements.
    pub fn for_update(mut self) -> Self {
        self.lock_for_update = true;
        self
    }

    /// Whether any filter condition was added. The default soft-delete
    /// visibility filter does not count; restricting to deleted rows does.
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty() || (self.only_deleted && self.soft_delete.is_some())
    }

    /// Whether the builder renders a soft delete rather than a hard one.
    pub fn deletes_softly(&self) -> bool {
        self.soft_delete.is_some() && !self.unscoped
    }

    /// Build a SELECT query returning `(sql, bind_values)`.
    pub fn build_select(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.checked_table()?;
        let projection = self.projection()?;
        let mut w = SqlWriter::new(self.dialect, format!("SELECT {projection} FROM {table}"));
        self.write_where(&mut w)?;
        self.write_order(&mut w)?;
        self.write_limit_offset(&mut w);
        if self.lock_for_update && self.dialect.supports_row_locking() {
            w.push(" FOR UPDATE");
        }
        Ok(w.finish())
    }

    /// Build the SELECT for a single row: ordered by primary key unless an
    /// order was given, limited to one row.
    pub fn build_first(&self) -> Result<(String, Vec<Value>), QueryError> {
        let mut first = self.clone();
        if first.order.is_empty() {
            if let Some(pk) = &self.primary_key {
                first = first.order_by(pk, true);
            }
        }
        first.limit(1).build_select()
    }

    /// Build a COUNT query. Order, limit and offset do not apply.
    pub fn build_count(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.checked_table()?;
        let mut w = SqlWriter::new(self.dialect, format!("SELECT COUNT(*) FROM {table}"));
        self.write_where(&mut w)?;
        Ok(w.finish())
    }

    /// Build a COUNT over a sub-select limited to one row, so the engine
    /// stops at the first match.
    pub fn build_exists(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.checked_table()?;
        let mut w = SqlWriter::new(
            self.dialect,
            format!("SELECT COUNT(*) FROM (SELECT 1 FROM {table}"),
        );
        self.write_where(&mut w)?;
        w.push(" LIMIT 1) AS matched");
        Ok(w.finish())
    }

    /// Build an UPDATE of the given columns over the filtered rows.
    pub fn build_update(&self, sets: &[(String, Value)]) -> Result<(String, Vec<Value>), QueryError> {
        if sets.is_empty() {
            return Err(QueryError::NoColumns { operation: "update" });
        }
        if !self.has_conditions() {
            return Err(QueryError::MissingCondition { operation: "update" });
        }
        let table = self.checked_table()?;
        let mut w = SqlWriter::new(self.dialect, format!("UPDATE {table} SET "));
        for (idx, (col, value)) in sets.iter().enumerate() {
            if idx > 0 {
                w.push(", ");
            }
            w.push(&checked_identifier(col, false, "column")?);
            w.push(" = ");
            w.bind(value.clone());
        }
        self.write_where(&mut w)?;
        Ok(w.finish())
    }

    /// Build the delete statement for the filtered rows.
    ///
    /// With a soft-delete column and a scoped query this is an UPDATE that
    /// stamps `deleted_at` on rows not yet deleted; otherwise a `DELETE`.
    pub fn build_delete(&self, now: DateTime<Utc>) -> Result<(String, Vec<Value>), QueryError> {
        if !self.has_conditions() {
            return Err(QueryError::MissingCondition { operation: "delete" });
        }
        let table = self.checked_table()?;
        let mut w = match (&self.soft_delete, self.deletes_softly()) {
            (Some(col), true) => {
                let col = checked_identifier(col, false, "column")?;
                let mut w = SqlWriter::new(self.dialect, format!("UPDATE {table} SET {col} = "));
                w.bind(Value::from(now));
                w
            }
            _ => SqlWriter::new(self.dialect, format!("DELETE FROM {table}")),
        };
        self.write_where(&mut w)?;
        Ok(w.finish())
    }

    /// Build a (multi-row) INSERT returning the full projection.
    ///
    /// Every row must bind exactly one value per column.
    pub fn build_insert(&self, columns: &[&str], rows: &[Vec<Value>]) -> Result<(String, Vec<Value>), QueryError> {
        if columns.is_empty() || rows.is_empty() {
            return Err(QueryError::NoColumns { operation: "insert" });
        }
        let mut w = self.insert_prefix(columns)?;
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QueryError::ArgumentCount {
                    expected: columns.len(),
                    got: row.len(),
                });
            }
            if idx > 0 {
                w.push(", ");
            }
            w.push("(");
            for (pos, value) in row.iter().enumerate() {
                if pos > 0 {
                    w.push(", ");
                }
                w.bind(value.clone());
            }
            w.push(")");
        }
        self.write_returning(&mut w)?;
        Ok(w.finish())
    }

    /// Build an INSERT that overwrites every column of an existing row with
    /// the same primary key.
    pub fn build_upsert(&self, columns: &[&str], values: Vec<Value>) -> Result<(String, Vec<Value>), QueryError> {
        let pk = self
            .primary_key
            .as_deref()
            .ok_or(QueryError::NoColumns { operation: "upsert" })?;
        let pk = checked_identifier(pk, false, "column")?;
        if columns.is_empty() {
            return Err(QueryError::NoColumns { operation: "upsert" });
        }
        if values.len() != columns.len() {
            return Err(QueryError::ArgumentCount {
                expected: columns.len(),
                got: values.len(),
            });
        }
        let mut w = self.insert_prefix(columns)?;
        w.push("(");
        for (pos, value) in values.into_iter().enumerate() {
            if pos > 0 {
                w.push(", ");
            }
            w.bind(value);
        }
        w.push(&format!(") ON CONFLICT ({pk}) DO UPDATE SET "));
        let mut updated: Vec<String> = columns
            .iter()
            .filter(|c| **c != pk)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        if updated.is_empty() {
            updated.push(format!("{pk} = excluded.{pk}"));
        }
        w.push(&updated.join(", "));
        self.write_returning(&mut w)?;
        Ok(w.finish())
    }

    fn insert_prefix(&self, columns: &[&str]) -> Result<SqlWriter, QueryError> {
        let table = self.checked_table()?;
        let mut cols = Vec::with_capacity(columns.len());
        for col in columns {
            cols.push(checked_identifier(col, false, "column")?);
        }
        Ok(SqlWriter::new(
            self.dialect,
            format!("INSERT INTO {table} ({}) VALUES ", cols.join(", ")),
        ))
    }

    fn write_returning(&self, w: &mut SqlWriter) -> Result<(), QueryError> {
        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.column_list(&self.columns, false)?
        };
        w.push(&format!(" RETURNING {projection}"));
        Ok(())
    }

    fn checked_table(&self) -> Result<String, QueryError> {
        checked_identifier(&self.table, false, "table")
    }

    fn projection(&self) -> Result<String, QueryError> {
        if !self.select.is_empty() {
            self.column_list(&self.select, true)
        } else if !self.columns.is_empty() {
            self.column_list(&self.columns, false)
        } else {
            Ok("*".to_string())
        }
    }

    fn column_list(&self, columns: &[String], allow_star: bool) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(checked_identifier(col, allow_star, "column")?);
        }
        Ok(out.join(", "))
    }

    fn visibility(&self) -> Option<Condition> {
        match (&self.soft_delete, self.only_deleted, self.unscoped) {
            (Some(col), true, _) => Some(Condition::IsNotNull(col.clone())),
            (None, true, _) => Some(Condition::Never),
            (Some(col), false, false) => Some(Condition::IsNull(col.clone())),
            _ => None,
        }
    }

    fn write_where(&self, w: &mut SqlWriter) -> Result<(), QueryError> {
        let visibility = self.visibility();
        let mut first = true;
        for cond in visibility.iter().chain(self.conditions.iter()) {
            w.push(if first { " WHERE " } else { " AND " });
            first = false;
            self.write_condition(w, cond)?;
        }
        Ok(())
    }

    fn write_condition(&self, w: &mut SqlWriter, cond: &Condition) -> Result<(), QueryError> {
        match cond {
            Condition::Eq(col, val) if val.is_null() => w.null_check(col, "IS NULL"),
            Condition::NotEq(col, val) if val.is_null() => w.null_check(col, "IS NOT NULL"),
            Condition::Eq(col, val) => w.binary(col, "=", val),
            Condition::NotEq(col, val) => w.binary(col, "!=", val),
            Condition::Like(col, pat) => w.binary(col, "LIKE", pat),
            Condition::Gt(col, val) => w.binary(col, ">", val),
            Condition::Lt(col, val) => w.binary(col, "<", val),
            Condition::In(col, vals) => {
                let col = checked_identifier(col, false, "column")?;
                if vals.is_empty() {
                    w.push("1 = 0");
                    return Ok(());
                }
                w.push(&format!("{col} IN ("));
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        w.push(", ");
                    }
                    w.bind(val.clone());
                }
                w.push(")");
                Ok(())
            }
            Condition::IsNull(col) => {
                let col = checked_identifier(col, false, "column")?;
                w.push(&format!("{col} IS NULL"));
                Ok(())
            }
            Condition::IsNotNull(col) => {
                let col = checked_identifier(col, false, "column")?;
                w.push(&format!("{col} IS NOT NULL"));
                Ok(())
            }
            Condition::Raw(predicate, args) => {
                w.push("(");
                w.push_raw(predicate, args)?;
                w.push(")");
                Ok(())
            }
            Condition::Never => {
                w.push("1 = 0");
                Ok(())
            }
        }
    }

    fn write_order(&self, w: &mut SqlWriter) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(self.order.len());
        for order in &self.order {
            match order {
                Order::Column(col, asc) => {
                    let col = checked_identifier(col, false, "column")?;
                    clauses.push(format!("{col} {}", if *asc { "ASC" } else { "DESC" }));
                }
                Order::Raw(expr) => clauses.push(expr.clone()),
            }
        }
        w.push(" ORDER BY ");
        w.push(&clauses.join(", "));
        Ok(())
    }

    fn write_limit_offset(&self, w: &mut SqlWriter) {
        let limit = self.limit_val.map(|n| n.min(MAX_ROW_BOUND));
        let offset = self.offset_val.map(|n| n.min(MAX_ROW_BOUND));
        match (limit, offset) {
            (Some(limit), Some(offset)) => w.push(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => w.push(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT; -1 means no limit.
            (None, Some(offset)) if self.dialect == Dialect::Sqlite => {
                w.push(&format!(" LIMIT -1 OFFSET {offset}"))
            }
            (None, Some(offset)) => w.push(&format!(" OFFSET {offset}")),
            (None, None) => {}
        }
    }
}

/// Accumulates SQL text and bind values, numbering placeholders as it goes.
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    dialect: Dialect,
}

impl SqlWriter {
    fn new(dialect: Dialect, sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
            dialect,
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn bind(&mut self, value: Value) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    fn null_check(&mut self, col: &str, check: &str) -> Result<(), QueryError> {
        let col = checked_identifier(col, false, "column")?;
        self.push(&format!("{col} {check}"));
        Ok(())
    }

    fn binary(&mut self, col: &str, op: &str, value: &Value) -> Result<(), QueryError> {
        let col = checked_identifier(col, false, "column")?;
        self.push(&format!("{col} {op} "));
        self.bind(value.clone());
        Ok(())
    }

    fn push_raw(&mut self, fragment: &str, args: &[Value]) -> Result<(), QueryError> {
        let expected = count_placeholders(fragment);
        if expected != args.len() {
            return Err(QueryError::ArgumentCount {
                expected,
                got: args.len(),
            });
        }
        let mut args = args.iter();
        let mut quoted = false;
        for c in fragment.chars() {
            match c {
                '\'' => {
                    quoted = !quoted;
                    self.sql.push(c);
                }
                '?' if !quoted => {
                    if let Some(arg) = args.next() {
                        self.bind(arg.clone());
                    }
                }
                _ => self.sql.push(c),
            }
        }
        Ok(())
    }

    fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

fn count_placeholders(fragment: &str) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for c in fragment.chars() {
        match c {
            '\'' => quoted = !quoted,
            '?' if !quoted => count += 1,
            _ => {}
        }
    }
    count
}

#[derive(Debug, Clone)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// Placeholders and bind values disagree.
    ArgumentCount { expected: usize, got: usize },
    /// An UPDATE or DELETE without any filter condition.
    MissingCondition { operation: &'static str },
    NoColumns { operation: &'static str },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::ArgumentCount { expected, got } => {
                write!(f, "Expected {expected} bind values, got {got}")
            }
            QueryError::MissingCondition { operation } => {
                write!(f, "Refusing to {operation} without conditions")
            }
            QueryError::NoColumns { operation } => {
                write!(f, "Nothing to {operation}: no columns given")
            }
        }
    }
}

impl std::error::Error for QueryError {}

fn checked_identifier(ident: &str, allow_star: bool, kind: &'static str) -> Result<String, QueryError> {
    if !is_valid_identifier(ident, allow_star) {
        return Err(QueryError::InvalidIdentifier {
            kind,
            ident: ident.to_string(),
        });
    }
    Ok(ident.to_string())
}

pub(crate) fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    for c in chars {
        if !(c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    struct Note {
        id: i64,
    }

    impl Entity for Note {
        type Id = i64;
        fn table_name() -> &'static str {
            "notes"
        }
        fn columns() -> &'static [&'static str] {
            &["id", "body", "deleted_at"]
        }
        fn id(&self) -> &i64 {
            &self.id
        }
        fn values(&self) -> Vec<Value> {
            vec![self.id.into(), Value::Text(None), Value::Timestamp(None)]
        }
        fn soft_delete_column() -> Option<&'static str> {
            Some("deleted_at")
        }
    }

    fn notes() -> QueryBuilder {
        QueryBuilder::for_entity::<Note>()
    }

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("users").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_eq() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("email", "a@b.com")
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE email = ?");
        assert_eq!(params, args!["a@b.com"]);
    }

    #[test]
    fn test_complex_query() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("status", "active")
            .where_like("name", "%alice%")
            .order_by("id", true)
            .limit(10)
            .offset(20)
            .select(["id", "name"])
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id, name FROM users WHERE status = ? AND name LIKE ? ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, args!["active", "%alice%"]);
    }

    #[test]
    fn test_count_query_ignores_paging() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("active", true)
            .order_by("id", false)
            .limit(5)
            .build_count()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE active = ?");
        assert_eq!(params, args![true]);
    }

    #[test]
    fn test_postgres_placeholders() {
        let (sql, params) = QueryBuilder::new_with_dialect("users", Dialect::Postgres)
            .where_eq("status", "active")
            .where_in("role", ["admin", "user"])
            .filter("age > ? AND age < ?", args![18, 65])
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE status = $1 AND role IN ($2, $3) AND (age > $4 AND age < $5)"
        );
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_raw_placeholders_skip_quoted_text() {
        let (sql, params) = QueryBuilder::new_with_dialect("users", Dialect::Postgres)
            .filter("name = '?' OR email = ?", args!["x@y.z"])
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE (name = '?' OR email = $1)");
        assert_eq!(params, args!["x@y.z"]);
    }

    #[test]
    fn test_raw_argument_count_mismatch() {
        let err = QueryBuilder::new("users")
            .filter("age > ? AND name = ?", args![1])
            .build_select()
            .unwrap_err();
        assert!(matches!(err, QueryError::ArgumentCount { expected: 2, got: 1 }));
    }

    #[test]
    fn test_invalid_identifier() {
        let err = QueryBuilder::new("users;drop").build_select().unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { kind: "table", .. }));

        let err = QueryBuilder::new("users")
            .where_eq("email = '' OR 1", 1)
            .build_select()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { kind: "column", .. }));
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let (sql, params) = QueryBuilder::new("users")
            .where_in("id", Vec::<i64>::new())
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE 1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_entity_builder_hides_deleted_rows() {
        let (sql, _) = notes().where_eq("id", 1).build_select().unwrap();
        assert_eq!(
            sql,
            "SELECT id, body, deleted_at FROM notes WHERE deleted_at IS NULL AND id = ?"
        );

        let (sql, _) = notes().unscoped().build_select().unwrap();
        assert_eq!(sql, "SELECT id, body, deleted_at FROM notes");

        let (sql, _) = notes().only_deleted().build_count().unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM notes WHERE deleted_at IS NOT NULL");
    }

    #[test]
    fn test_only_deleted_without_soft_delete_matches_nothing() {
        let (sql, _) = QueryBuilder::new("products").only_deleted().build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM products WHERE 1 = 0");
    }

    #[test]
    fn test_first_orders_by_primary_key() {
        let (sql, _) = notes().build_first().unwrap();
        assert_eq!(
            sql,
            "SELECT id, body, deleted_at FROM notes WHERE deleted_at IS NULL ORDER BY id ASC LIMIT 1"
        );

        let (sql, _) = notes().order_raw("body DESC").build_first().unwrap();
        assert!(sql.ends_with("ORDER BY body DESC LIMIT 1"));
    }

    #[test]
    fn test_exists_limits_subselect() {
        let (sql, params) = notes()
            .where_eq("body", "hi")
            .dialect(Dialect::Postgres)
            .build_exists()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT 1 FROM notes WHERE deleted_at IS NULL AND body = $1 LIMIT 1) AS matched"
        );
        assert_eq!(params, args!["hi"]);
    }

    #[test]
    fn test_row_locking_per_dialect() {
        let pg = notes().where_eq("id", 1).for_update().dialect(Dialect::Postgres);
        let (sql, _) = pg.build_first().unwrap();
        assert!(sql.ends_with("LIMIT 1 FOR UPDATE"), "{sql}");

        let (sql, _) = pg.dialect(Dialect::Sqlite).build_first().unwrap();
        assert!(sql.ends_with("LIMIT 1"), "{sql}");
    }

    #[test]
    fn test_sqlite_offset_without_limit() {
        let (sql, _) = QueryBuilder::new_with_dialect("users", Dialect::Sqlite)
            .offset(5)
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users LIMIT -1 OFFSET 5");

        let (sql, _) = QueryBuilder::new_with_dialect("users", Dialect::Postgres)
            .offset(5)
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users OFFSET 5");
    }

    #[test]
    fn test_update_numbers_set_before_where() {
        let (sql, params) = notes()
            .dialect(Dialect::Postgres)
            .where_eq("id", 7)
            .build_update(&[("body".to_string(), "new".into())])
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE notes SET body = $1 WHERE deleted_at IS NULL AND id = $2"
        );
        assert_eq!(params, args!["new", 7]);
    }

    #[test]
    fn test_update_and_delete_require_conditions() {
        let err = notes()
            .order_raw("id")
            .build_update(&[("body".to_string(), "x".into())])
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingCondition { operation: "update" }));

        let err = notes().build_delete(Utc::now()).unwrap_err();
        assert!(matches!(err, QueryError::MissingCondition { operation: "delete" }));
    }

    #[test]
    fn test_soft_and_hard_delete() {
        let now = Utc::now();
        let (sql, params) = notes().where_eq("id", 1).build_delete(now).unwrap();
        assert_eq!(
            sql,
            "UPDATE notes SET deleted_at = ? WHERE deleted_at IS NULL AND id = ?"
        );
        assert_eq!(params, vec![Value::from(now), Value::from(1)]);

        let (sql, _) = notes().unscoped().where_eq("id", 1).build_delete(now).unwrap();
        assert_eq!(sql, "DELETE FROM notes WHERE id = ?");

        let (sql, _) = QueryBuilder::new("products")
            .where_eq("id", 1)
            .build_delete(now)
            .unwrap();
        assert_eq!(sql, "DELETE FROM products WHERE id = ?");
    }

    #[test]
    fn test_only_deleted_delete_purges_marked_rows() {
        let (sql, params) = notes().only_deleted().build_delete(Utc::now()).unwrap();
        assert_eq!(sql, "DELETE FROM notes WHERE deleted_at IS NOT NULL");
        assert!(params.is_empty());

        // No marker column means nothing to purge, and no condition either.
        let err = QueryBuilder::new("products")
            .only_deleted()
            .build_delete(Utc::now())
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingCondition { operation: "delete" }));
    }

    #[test]
    fn test_null_equality_renders_is_null() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("email", Value::Text(None))
            .where_not_eq("name", Value::Null)
            .where_eq("age", 3)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE email IS NULL AND name IS NOT NULL AND age = ?"
        );
        assert_eq!(params, args![3]);
    }

    #[test]
    fn test_limit_and_offset_are_clamped() {
        let (sql, _) = QueryBuilder::new("users")
            .limit(u64::MAX)
            .offset(u64::MAX)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            format!("SELECT * FROM users LIMIT {MAX_ROW_BOUND} OFFSET {MAX_ROW_BOUND}")
        );
        assert_eq!(MAX_ROW_BOUND.to_string(), "9223372036854775807");
    }

    #[test]
    fn test_multi_row_insert() {
        let (sql, params) = notes()
            .dialect(Dialect::Postgres)
            .build_insert(&["body"], &[args!["a"], args!["b"]])
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO notes (body) VALUES ($1), ($2) RETURNING id, body, deleted_at"
        );
        assert_eq!(params, args!["a", "b"]);
    }

    #[test]
    fn test_upsert_overwrites_non_key_columns() {
        let (sql, params) = notes()
            .build_upsert(&["id", "body"], args![3, "c"])
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO notes (id, body) VALUES (?, ?) ON CONFLICT (id) DO UPDATE SET body = excluded.body RETURNING id, body, deleted_at"
        );
        assert_eq!(params, args![3, "c"]);
    }
}
