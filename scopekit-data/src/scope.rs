//! Composable query modifiers.
//!
//! A [`Scope`] takes a [`QueryBuilder`] and returns a modified one. Scopes are
//! applied in the order they are given; two filters are conjunctive, they
//! never replace each other.
//!
//! ```ignore
//! let adults = repo
//!     .list(&[
//!         scope::filter("age >= ?", args![18]),
//!         scope::order("age DESC"),
//!         scope::limit(10),
//!     ])
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::query::QueryBuilder;
use crate::value::Value;

type ScopeFn = dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync;

/// A query transformation.
///
/// `Scope::default()` is the no-op scope: it is skipped when applied and
/// does not satisfy the condition guard on updates and deletes.
#[derive(Clone, Default)]
pub struct Scope(Option<Arc<ScopeFn>>);

impl Scope {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        Scope(Some(Arc::new(f)))
    }

    pub fn noop() -> Self {
        Scope(None)
    }

    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    pub fn apply(&self, builder: QueryBuilder) -> QueryBuilder {
        match &self.0 {
            Some(f) => f(builder),
            None => builder,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_noop() { "Scope(noop)" } else { "Scope(..)" })
    }
}

impl From<Option<Scope>> for Scope {
    fn from(scope: Option<Scope>) -> Self {
        scope.unwrap_or_default()
    }
}

/// Apply scopes to a builder in order.
pub fn apply_scopes(builder: QueryBuilder, scopes: &[Scope]) -> QueryBuilder {
    scopes.iter().fold(builder, |builder, scope| scope.apply(builder))
}

/// True when every scope is a no-op (or there are none).
pub fn all_noop(scopes: &[Scope]) -> bool {
    scopes.iter().all(Scope::is_noop)
}

/// Raw filter condition with `?` placeholders.
pub fn filter(predicate: &str, args: impl IntoIterator<Item = impl Into<Value>>) -> Scope {
    let predicate = predicate.to_string();
    let args: Vec<Value> = args.into_iter().map(Into::into).collect();
    Scope::new(move |q| q.filter(&predicate, args.clone()))
}

/// One equality filter per key. Keys are unique; they are rendered in
/// sorted order.
pub fn where_eq<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Scope
where
    K: Into<String>,
    V: Into<Value>,
{
    let pairs: BTreeMap<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Scope::new(move |q| {
        pairs
            .iter()
            .fold(q, |q, (col, val)| q.where_eq(col, val.clone()))
    })
}

/// Append an ordering expression such as `"name ASC"`.
pub fn order(expression: &str) -> Scope {
    let expression = expression.to_string();
    Scope::new(move |q| q.order_raw(&expression))
}

/// Restrict the returned columns. Fields of unselected columns keep their
/// default value when the row is decoded (mark them `#[sqlx(default)]`).
pub fn select<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Scope {
    let columns: Vec<String> = columns
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();
    Scope::new(move |q| q.select(&columns))
}

pub fn limit(n: u64) -> Scope {
    Scope::new(move |q| q.limit(n))
}

pub fn offset(n: u64) -> Scope {
    Scope::new(move |q| q.offset(n))
}

/// Include soft-deleted rows.
pub fn with_deleted() -> Scope {
    Scope::new(QueryBuilder::unscoped)
}

/// Only soft-deleted rows.
pub fn only_deleted() -> Scope {
    Scope::new(QueryBuilder::only_deleted)
}
