//! Transaction lifecycle.

use futures_util::future::BoxFuture;
use scopekit_data::DataError;

use crate::driver::{DbPool, DbTransaction};
use crate::error::SqlxResultExt;

/// Run `f` inside a transaction begun on `pool`.
///
/// - `Ok` from `f`: the transaction is committed and the value returned
/// - `Err` from `f`: the transaction is rolled back and the error returned
///
/// A failed rollback is logged; the callback's error is still the one
/// returned. If the future is dropped mid-way the transaction is dropped
/// too, which rolls it back.
///
/// ```ignore
/// let id = transaction(&pool, |tx| {
///     let repo = repo.clone();
///     Box::pin(async move {
///         let mut user = User::new("alice");
///         repo.create(Some(tx), &mut user).await?;
///         Ok(user.id)
///     })
/// })
/// .await?;
/// ```
pub async fn transaction<R, F>(pool: &DbPool, f: F) -> Result<R, DataError>
where
    F: for<'t> FnOnce(&'t mut DbTransaction<'static>) -> BoxFuture<'t, Result<R, DataError>>,
{
    let mut tx = pool.begin().await.into_data_result()?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.into_data_result()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
