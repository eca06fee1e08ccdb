use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use scopekit_data::entity::column_values;
use scopekit_data::scope::{all_noop, apply_scopes};
use scopekit_data::{
    validate_entity, DataError, Entity, PageRequest, PageResult, QueryBuilder, Scope, Value,
};
use sqlx::FromRow;

use crate::driver::{bind_values, DbPool, DbRow, DbTransaction, DIALECT};
use crate::error::SqlxResultExt;
use crate::tx;

/// Rows per INSERT statement in [`Repository::batch_insert`] when no size
/// is given.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A generic repository for one entity type over an sqlx pool.
///
/// Every operation builds a fresh [`QueryBuilder`] from the entity metadata,
/// applies the caller's scopes in order, and runs the statement on the
/// given transaction or, when `tx` is `None`, on the pool.
///
/// # Example
///
/// ```ignore
/// let repo = Repository::<User>::new(pool.clone())?;
/// let mut user = User::new("alice");
/// repo.create(None, &mut user).await?;
/// let found = repo.first(&[scope::where_eq([("name", "alice")])]).await?;
/// ```
pub struct Repository<T> {
    pool: DbPool,
    _marker: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Entity + for<'r> FromRow<'r, DbRow>,
{
    /// Create a repository, validating the entity metadata once.
    pub fn new(pool: DbPool) -> Result<Self, DataError> {
        validate_entity::<T>()?;
        Ok(Self {
            pool,
            _marker: PhantomData,
        })
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Create a `QueryBuilder` pre-configured for this entity's table.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::for_entity::<T>().dialect(DIALECT)
    }

    fn scoped(&self, scopes: &[Scope]) -> QueryBuilder {
        apply_scopes(self.query(), scopes)
    }

    /// Run `f` in a transaction on this repository's pool. See
    /// [`tx::transaction`].
    pub async fn transact<R, F>(&self, f: F) -> Result<R, DataError>
    where
        F: for<'t> FnOnce(&'t mut DbTransaction<'static>) -> BoxFuture<'t, Result<R, DataError>>,
    {
        tx::transaction(&self.pool, f).await
    }

    /// Insert one record. Generated columns (a zero primary key, default
    /// values, timestamps) are written back into `entity`.
    pub async fn create(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        entity: &mut T,
    ) -> Result<(), DataError> {
        let (columns, values) = insert_row(entity, Utc::now())?;
        let (sql, params) = self.query().build_insert(&columns, &[values])?;
        *entity = self
            .fetch_optional(tx, &sql, params)
            .await?
            .ok_or_else(|| DataError::Other(format!("insert into '{}' returned no row", T::table_name())))?;
        Ok(())
    }

    /// Save every column of `entity`: insert it when its primary key is
    /// zero, otherwise overwrite the row with the same key (inserting it if
    /// missing).
    pub async fn update(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        entity: &mut T,
    ) -> Result<(), DataError> {
        let pairs = column_values(entity)?;
        let new_record = pairs
            .iter()
            .any(|(col, value)| *col == T::id_column() && value.is_zero());
        if new_record {
            return self.create(tx, entity).await;
        }

        let now = Utc::now();
        let (columns, values): (Vec<&str>, Vec<Value>) = pairs
            .into_iter()
            .map(|(col, value)| {
                if Some(col) == T::updated_at_column() {
                    (col, Value::from(now))
                } else {
                    (col, stamp_if_zero(col, value, T::created_at_column(), now))
                }
            })
            .unzip();
        let (sql, params) = self.query().build_upsert(&columns, values)?;
        *entity = self
            .fetch_optional(tx, &sql, params)
            .await?
            .ok_or_else(|| DataError::Other(format!("save into '{}' returned no row", T::table_name())))?;
        Ok(())
    }

    /// Update one column on every row matched by `scopes`. Returns the number
    /// of rows affected.
    ///
    /// Fails with [`DataError::Dangerous`] unless at least one non-noop scope
    /// adding a condition is given.
    pub async fn update_column(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        column: &str,
        value: impl Into<Value>,
        scopes: &[Scope],
    ) -> Result<u64, DataError> {
        let value: Value = value.into();
        self.update_columns(tx, [(column, value)], scopes).await
    }

    /// Update several columns on every row matched by `scopes`. An empty
    /// set of updates touches nothing and returns 0.
    pub async fn update_columns<K, V>(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        updates: impl IntoIterator<Item = (K, V)>,
        scopes: &[Scope],
    ) -> Result<u64, DataError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        if all_noop(scopes) {
            return Err(DataError::Dangerous("update".into()));
        }
        let mut sets: BTreeMap<String, Value> = updates
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if sets.is_empty() {
            return Ok(0);
        }
        if let Some(col) = T::updated_at_column() {
            sets.entry(col.to_string())
                .or_insert_with(|| Value::from(Utc::now()));
        }
        let sets: Vec<(String, Value)> = sets.into_iter().collect();
        let (sql, params) = self.scoped(scopes).build_update(&sets)?;
        self.execute(tx, &sql, params).await
    }

    /// Delete every row matched by `scopes`. Entities with a soft-delete
    /// column get the column stamped instead, unless the scopes include
    /// [`scope::with_deleted`](scopekit_data::scope::with_deleted).
    pub async fn delete(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        scopes: &[Scope],
    ) -> Result<u64, DataError> {
        if all_noop(scopes) {
            return Err(DataError::Dangerous("delete".into()));
        }
        let (sql, params) = self.scoped(scopes).build_delete(Utc::now())?;
        self.execute(tx, &sql, params).await
    }

    /// Insert `entities` in chunks of `batch_size` rows (default
    /// [`DEFAULT_BATCH_SIZE`], also used for `Some(0)`). Generated columns
    /// are written back into each entity.
    ///
    /// Without a caller transaction every chunk runs in one transaction
    /// begun here, so a failure leaves no rows behind. `entities` is only
    /// written back once every statement succeeded.
    pub async fn batch_insert(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        entities: &mut [T],
        batch_size: Option<usize>,
    ) -> Result<(), DataError> {
        if entities.is_empty() {
            return Ok(());
        }
        let size = match batch_size {
            None | Some(0) => DEFAULT_BATCH_SIZE,
            Some(n) => n,
        };
        let inserted = match tx {
            Some(tx) => self.insert_chunks(tx, entities, size).await?,
            None => {
                let mut tx = self.pool.begin().await.into_data_result()?;
                match self.insert_chunks(&mut tx, entities, size).await {
                    Ok(rows) => {
                        tx.commit().await.into_data_result()?;
                        rows
                    }
                    Err(err) => {
                        if let Err(rollback) = tx.rollback().await {
                            tracing::warn!(error = %rollback, "batch insert rollback failed");
                        }
                        return Err(err);
                    }
                }
            }
        };
        for (slot, row) in entities.iter_mut().zip(inserted) {
            *slot = row;
        }
        Ok(())
    }

    async fn insert_chunks(
        &self,
        tx: &mut DbTransaction<'_>,
        entities: &[T],
        size: usize,
    ) -> Result<Vec<T>, DataError> {
        let now = Utc::now();
        let mut out = Vec::with_capacity(entities.len());
        for chunk in entities.chunks(size) {
            let rows = chunk
                .iter()
                .map(|entity| insert_row(entity, now))
                .collect::<Result<Vec<_>, _>>()?;

            // Rows omitting different columns cannot share one VALUES list.
            let mut start = 0;
            while start < rows.len() {
                let columns = &rows[start].0;
                let end = start
                    + rows[start..]
                        .iter()
                        .take_while(|(cols, _)| cols == columns)
                        .count();
                let values: Vec<Vec<Value>> = rows[start..end]
                    .iter()
                    .map(|(_, values)| values.clone())
                    .collect();
                let (sql, params) = self.query().build_insert(columns, &values)?;
                let inserted = self.fetch_all(Some(&mut *tx), &sql, params).await?;
                if inserted.len() != end - start {
                    return Err(DataError::Other(format!(
                        "batch insert into '{}' returned {} rows for {} records",
                        T::table_name(),
                        inserted.len(),
                        end - start
                    )));
                }
                out.extend(inserted);
                start = end;
            }
        }
        Ok(out)
    }

    /// First row matched by `scopes`, ordered by primary key unless an order
    /// scope is given.
    pub async fn first(&self, scopes: &[Scope]) -> Result<T, DataError> {
        let (sql, params) = self.scoped(scopes).build_first()?;
        self.fetch_optional(None, &sql, params)
            .await?
            .ok_or_else(not_found::<T>)
    }

    pub async fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        let (sql, params) = self
            .query()
            .where_eq(T::id_column(), id.clone())
            .build_first()?;
        self.fetch_optional(None, &sql, params).await
    }

    /// Every row matched by `scopes`. No limit is applied unless a scope
    /// asks for one.
    pub async fn list(&self, scopes: &[Scope]) -> Result<Vec<T>, DataError> {
        let (sql, params) = self.scoped(scopes).build_select()?;
        self.fetch_all(None, &sql, params).await
    }

    pub async fn count(&self, scopes: &[Scope]) -> Result<u64, DataError> {
        let (sql, params) = self.scoped(scopes).build_count()?;
        self.fetch_count(&sql, params).await
    }

    /// Whether any row matches; the engine stops at the first match.
    pub async fn exists(&self, scopes: &[Scope]) -> Result<bool, DataError> {
        let (sql, params) = self.scoped(scopes).build_exists()?;
        Ok(self.fetch_count(&sql, params).await? > 0)
    }

    /// Like [`Repository::first`], locking the row until `tx` ends.
    /// Fails with [`DataError::TxRequired`] when `tx` is `None`.
    pub async fn first_for_update(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        scopes: &[Scope],
    ) -> Result<T, DataError> {
        let Some(tx) = tx else {
            return Err(DataError::TxRequired);
        };
        let (sql, params) = self.scoped(scopes).for_update().build_first()?;
        self.fetch_optional(Some(tx), &sql, params)
            .await?
            .ok_or_else(not_found::<T>)
    }

    /// Like [`Repository::list`], locking the rows until `tx` ends.
    /// Fails with [`DataError::TxRequired`] when `tx` is `None`.
    pub async fn find_for_update(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        scopes: &[Scope],
    ) -> Result<Vec<T>, DataError> {
        let Some(tx) = tx else {
            return Err(DataError::TxRequired);
        };
        let (sql, params) = self.scoped(scopes).for_update().build_select()?;
        self.fetch_all(Some(tx), &sql, params).await
    }

    /// One page of the rows matched by `scopes`. `page` is 1-based; see
    /// [`PageRequest`] for how page and size are normalized.
    ///
    /// The total and the items come from two separate statements, so under
    /// concurrent writes they may disagree.
    pub async fn page(
        &self,
        page: i64,
        page_size: i64,
        scopes: &[Scope],
    ) -> Result<PageResult<T>, DataError> {
        self.page_with(&PageRequest::new(page, page_size), scopes)
            .await
    }

    pub async fn page_with(
        &self,
        request: &PageRequest,
        scopes: &[Scope],
    ) -> Result<PageResult<T>, DataError> {
        let total = self.count(scopes).await?;
        let (sql, params) = self
            .scoped(scopes)
            .limit(request.page_size())
            .offset(request.offset())
            .build_select()?;
        let items = self.fetch_all(None, &sql, params).await?;
        Ok(PageResult::new(items, request, total))
    }

    async fn execute(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<u64, DataError> {
        trace_statement::<T>(sql, params.len(), tx.is_some());
        let query = bind_values!(sqlx::query(sql), params);
        let done = match tx {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }
        .into_data_result()?;
        Ok(done.rows_affected())
    }

    async fn fetch_optional(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>, DataError> {
        trace_statement::<T>(sql, params.len(), tx.is_some());
        let query = bind_values!(sqlx::query_as::<_, T>(sql), params);
        let result = match tx {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        };
        result.into_data_result()
    }

    async fn fetch_all(
        &self,
        tx: Option<&mut DbTransaction<'_>>,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>, DataError> {
        trace_statement::<T>(sql, params.len(), tx.is_some());
        let query = bind_values!(sqlx::query_as::<_, T>(sql), params);
        let result = match tx {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        };
        result.into_data_result()
    }

    async fn fetch_count(&self, sql: &str, params: Vec<Value>) -> Result<u64, DataError> {
        trace_statement::<T>(sql, params.len(), false);
        let count: i64 = bind_values!(sqlx::query_scalar::<_, i64>(sql), params)
            .fetch_one(&self.pool)
            .await
            .into_data_result()?;
        Ok(count.max(0) as u64)
    }
}

fn trace_statement<T: Entity>(sql: &str, params: usize, in_tx: bool) {
    tracing::debug!(table = T::table_name(), sql, params, in_tx, "executing statement");
}

fn not_found<T: Entity>() -> DataError {
    DataError::NotFound(format!("no matching row in '{}'", T::table_name()))
}

fn stamp_if_zero(
    col: &str,
    value: Value,
    stamped: Option<&str>,
    now: DateTime<Utc>,
) -> Value {
    if Some(col) == stamped && value.is_zero() {
        Value::from(now)
    } else {
        value
    }
}

/// Columns and values for an INSERT: a zero primary key is left out so the
/// engine generates it, zero created/updated timestamps are set to `now`.
fn insert_row<T: Entity>(
    entity: &T,
    now: DateTime<Utc>,
) -> Result<(Vec<&'static str>, Vec<Value>), DataError> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (col, value) in column_values(entity)? {
        if col == T::id_column() && value.is_zero() {
            continue;
        }
        let value = stamp_if_zero(col, value, T::created_at_column(), now);
        let value = stamp_if_zero(col, value, T::updated_at_column(), now);
        columns.push(col);
        values.push(value);
    }
    Ok((columns, values))
}
