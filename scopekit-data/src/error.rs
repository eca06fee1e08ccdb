use crate::query::QueryError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// The entity type declares metadata a repository cannot work with.
    InvalidEntity(String),
    NotFound(String),
    /// A locking read was attempted outside a transaction.
    TxRequired,
    /// A mass update or delete was attempted without any condition.
    Dangerous(String),
    /// The builder rejected an identifier supplied as data.
    InvalidQuery(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `scopekit-sqlx`) to wrap driver-specific
    /// errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    pub fn is_dangerous(&self) -> bool {
        matches!(self, DataError::Dangerous(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::InvalidEntity(msg) => write!(f, "Invalid entity type: {msg}"),
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::TxRequired => write!(f, "A transaction is required"),
            DataError::Dangerous(op) => {
                write!(f, "Dangerous operation is prohibited: {op} without conditions")
            }
            DataError::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::MissingCondition { operation } => {
                DataError::Dangerous(operation.to_string())
            }
            other => DataError::InvalidQuery(other.to_string()),
        }
    }
}
