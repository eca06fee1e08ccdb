//! Compile-time driver selection.
//!
//! Exactly one of the `sqlite` (default) or `postgres` features picks the
//! [`Db`] every repository in the process talks to.

use scopekit_data::Dialect;

#[cfg(all(feature = "sqlite", feature = "postgres"))]
compile_error!("features `sqlite` and `postgres` are mutually exclusive; disable default features to use `postgres`");

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable one database driver feature: `sqlite` or `postgres`");

#[cfg(feature = "sqlite")]
pub type Db = sqlx::Sqlite;

#[cfg(feature = "postgres")]
pub type Db = sqlx::Postgres;

#[cfg(feature = "sqlite")]
pub const DIALECT: Dialect = Dialect::Sqlite;

#[cfg(feature = "postgres")]
pub const DIALECT: Dialect = Dialect::Postgres;

pub type DbRow = <Db as sqlx::Database>::Row;
pub type DbPool = sqlx::Pool<Db>;
pub type DbTransaction<'c> = sqlx::Transaction<'c, Db>;

/// Bind every [`scopekit_data::Value`] onto an sqlx `Query`, `QueryAs` or
/// `QueryScalar`, keeping typed NULLs typed.
macro_rules! bind_values {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for value in $params {
            query = match value {
                scopekit_data::Value::Null => query.bind(None::<String>),
                scopekit_data::Value::Bool(v) => query.bind(v),
                scopekit_data::Value::Int(v) => query.bind(v),
                scopekit_data::Value::Float(v) => query.bind(v),
                scopekit_data::Value::Text(v) => query.bind(v),
                scopekit_data::Value::Bytes(v) => query.bind(v),
                scopekit_data::Value::Timestamp(v) => query.bind(v),
            };
        }
        query
    }};
}

pub(crate) use bind_values;
