use scopekit_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Instead, use `.into_data_error()` or [`SqlxResultExt`].
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            other => DataError::database(other),
        }
    }
}

/// `Result` counterpart of [`SqlxErrorExt`].
pub trait SqlxResultExt<T> {
    fn into_data_result(self) -> SqlxResult<T>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn into_data_result(self) -> SqlxResult<T> {
        self.map_err(SqlxErrorExt::into_data_error)
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;
