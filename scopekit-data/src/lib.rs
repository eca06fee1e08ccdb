//! # scopekit-data
//!
//! Backend-agnostic building blocks for scoped repositories:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] | Table metadata and bind values for a record type |
//! | [`QueryBuilder`] | SQL generation for selects, counts, updates, deletes and inserts |
//! | [`Scope`] | Composable query modifier, see the [`scope`] module for constructors |
//! | [`PageRequest`] / [`PageResult`] | Pagination arithmetic and result page |
//! | [`DataError`] | Error vocabulary shared by the backends |
//!
//! The `scopekit-sqlx` crate executes these statements against a database.

pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod scope;
pub mod value;

pub use entity::{validate_entity, Entity};
pub use error::DataError;
pub use page::{PageRequest, PageResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use query::{Dialect, QueryBuilder, QueryError, MAX_ROW_BOUND};
pub use scope::Scope;
pub use value::Value;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::scope::{self, Scope};
    pub use crate::{args, DataError, Entity, PageRequest, PageResult, QueryBuilder, Value};
}
