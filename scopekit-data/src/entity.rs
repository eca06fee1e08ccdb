use crate::error::DataError;
use crate::query::is_valid_identifier;
use crate::value::Value;

/// Trait representing a database entity: a table name, a primary-key column,
/// a column list and the values bound for each column.
///
/// # Example
///
/// ```ignore
/// impl Entity for User {
///     type Id = i64;
///     fn table_name() -> &'static str { "users" }
///     fn columns() -> &'static [&'static str] { &["id", "name", "deleted_at"] }
///     fn id(&self) -> &i64 { &self.id }
///     fn values(&self) -> Vec<Value> {
///         vec![self.id.into(), self.name.clone().into(), self.deleted_at.into()]
///     }
///     fn soft_delete_column() -> Option<&'static str> { Some("deleted_at") }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    type Id: Clone + Into<Value> + Send + Sync + 'static;

    fn table_name() -> &'static str;

    fn id_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str];

    fn id(&self) -> &Self::Id;

    /// Bind values, one per entry of [`Entity::columns`], in the same order.
    fn values(&self) -> Vec<Value>;

    /// Column holding the deletion marker. When set, deletes only stamp the
    /// column and reads hide stamped rows unless the query is unscoped.
    fn soft_delete_column() -> Option<&'static str> {
        None
    }

    fn created_at_column() -> Option<&'static str> {
        None
    }

    fn updated_at_column() -> Option<&'static str> {
        None
    }
}

/// Check the metadata an [`Entity`] declares.
///
/// Fails with [`DataError::InvalidEntity`] when the table or a column is not
/// a plain SQL identifier, when columns are missing or repeated, or when the
/// primary-key and bookkeeping columns are not part of the column list.
pub fn validate_entity<T: Entity>() -> Result<(), DataError> {
    let table = T::table_name();
    if !is_valid_identifier(table, false) {
        return Err(DataError::InvalidEntity(format!(
            "invalid table name '{table}'"
        )));
    }

    let columns = T::columns();
    if columns.is_empty() {
        return Err(DataError::InvalidEntity(format!(
            "entity for table '{table}' declares no columns"
        )));
    }
    for (idx, col) in columns.iter().enumerate() {
        if !is_valid_identifier(col, false) {
            return Err(DataError::InvalidEntity(format!(
                "invalid column name '{col}' in table '{table}'"
            )));
        }
        if columns[..idx].contains(col) {
            return Err(DataError::InvalidEntity(format!(
                "duplicate column '{col}' in table '{table}'"
            )));
        }
    }

    let declared = [
        ("primary key", Some(T::id_column())),
        ("soft delete", T::soft_delete_column()),
        ("created at", T::created_at_column()),
        ("updated at", T::updated_at_column()),
    ];
    for (role, col) in declared {
        if let Some(col) = col {
            if !columns.contains(&col) {
                return Err(DataError::InvalidEntity(format!(
                    "{role} column '{col}' is not a column of table '{table}'"
                )));
            }
        }
    }
    Ok(())
}

/// Pair each column with its value, checking the two lists line up.
pub fn column_values<T: Entity>(entity: &T) -> Result<Vec<(&'static str, Value)>, DataError> {
    let columns = T::columns();
    let values = entity.values();
    if values.len() != columns.len() {
        return Err(DataError::InvalidEntity(format!(
            "table '{}' declares {} columns but the entity produced {} values",
            T::table_name(),
            columns.len(),
            values.len()
        )));
    }
    Ok(columns.iter().copied().zip(values).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        id: i64,
    }

    impl Entity for Account {
        type Id = i64;
        fn table_name() -> &'static str {
            "accounts"
        }
        fn columns() -> &'static [&'static str] {
            &["id", "owner", "deleted_at"]
        }
        fn id(&self) -> &i64 {
            &self.id
        }
        fn values(&self) -> Vec<Value> {
            vec![self.id.into(), "bob".into(), Value::Timestamp(None)]
        }
        fn soft_delete_column() -> Option<&'static str> {
            Some("deleted_at")
        }
    }

    struct BadTable;

    impl Entity for BadTable {
        type Id = i64;
        fn table_name() -> &'static str {
            "accounts; drop table accounts"
        }
        fn columns() -> &'static [&'static str] {
            &["id"]
        }
        fn id(&self) -> &i64 {
            &0
        }
        fn values(&self) -> Vec<Value> {
            vec![Value::Int(Some(0))]
        }
    }

    struct MissingKey;

    impl Entity for MissingKey {
        type Id = String;
        fn table_name() -> &'static str {
            "tags"
        }
        fn id_column() -> &'static str {
            "slug"
        }
        fn columns() -> &'static [&'static str] {
            &["label"]
        }
        fn id(&self) -> &String {
            unreachable!()
        }
        fn values(&self) -> Vec<Value> {
            Vec::new()
        }
    }

    struct Duplicated;

    impl Entity for Duplicated {
        type Id = i64;
        fn table_name() -> &'static str {
            "dups"
        }
        fn columns() -> &'static [&'static str] {
            &["id", "name", "name"]
        }
        fn id(&self) -> &i64 {
            &0
        }
        fn values(&self) -> Vec<Value> {
            Vec::new()
        }
    }

    #[test]
    fn valid_entity_passes() {
        assert!(validate_entity::<Account>().is_ok());
    }

    #[test]
    fn rejects_bad_metadata() {
        for err in [
            validate_entity::<BadTable>().unwrap_err(),
            validate_entity::<MissingKey>().unwrap_err(),
            validate_entity::<Duplicated>().unwrap_err(),
        ] {
            assert!(matches!(err, DataError::InvalidEntity(_)), "{err}");
        }
    }

    #[test]
    fn column_values_lines_up() {
        let pairs = column_values(&Account { id: 3 }).unwrap();
        assert_eq!(pairs[0], ("id", Value::Int(Some(3))));
        assert_eq!(pairs[2], ("deleted_at", Value::Timestamp(None)));
    }
}
