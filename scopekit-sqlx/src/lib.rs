//! # scopekit-sqlx: SQLx backend for scoped repositories
//!
//! This crate runs the statements built by [`scopekit_data`] against a real
//! database through [SQLx](https://github.com/launchbadge/sqlx). It adds the
//! generic repository, transaction helper, datasource configuration and
//! error bridging.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Repository<T>`] | Generic CRUD, pagination and locking reads for one entity type |
//! | [`transaction`] | Commit-on-`Ok`, rollback-on-`Err` transaction helper |
//! | [`DataSourceConfig`] | Pool settings from YAML, `.env` and `DATASOURCE_*` variables |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! Exactly one database driver is compiled in:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite` (default) | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//!
//! # Quick start
//!
//! ```ignore
//! use scopekit_sqlx::prelude::*;
//!
//! let pool = DataSourceConfig::load("application.yaml")?.connect().await?;
//! let repo = Repository::<User>::new(pool)?;
//!
//! let mut user = User::new("alice", 30);
//! repo.create(None, &mut user).await?;
//!
//! let adults = repo
//!     .page(1, 20, &[scope::filter("age >= ?", args![18]), scope::order("name")])
//!     .await?;
//!
//! repo.transact(|tx| {
//!     let repo = repo.clone();
//!     Box::pin(async move {
//!         let mut locked = repo
//!             .first_for_update(Some(&mut *tx), &[scope::where_eq([("name", "alice")])])
//!             .await?;
//!         locked.age += 1;
//!         repo.update(Some(tx), &mut locked).await
//!     })
//! })
//! .await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use scopekit_sqlx::SqlxErrorExt;
//!
//! let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
//!     .fetch_one(repo.pool())
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod repository;
pub mod tx;

pub use config::{ConfigError, DataSourceConfig};
pub use driver::{Db, DbPool, DbRow, DbTransaction, DIALECT};
pub use error::{SqlxErrorExt, SqlxResult, SqlxResultExt};
pub use repository::{Repository, DEFAULT_BATCH_SIZE};
pub use tx::transaction;

/// Re-exports of the most commonly used types from both `scopekit-data` and this crate.
pub mod prelude {
    pub use crate::{
        transaction, DataSourceConfig, DbPool, DbTransaction, Repository, SqlxErrorExt,
    };
    pub use scopekit_data::prelude::*;
}
