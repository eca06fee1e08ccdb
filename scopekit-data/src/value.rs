use chrono::{DateTime, Utc};

/// A typed bind parameter.
///
/// Every typed variant carries an `Option` so that a NULL keeps its SQL type
/// when bound (Postgres refuses an untyped text NULL for a timestamp column).
/// [`Value::Null`] is the untyped NULL, used when no type is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bytes(Option<Vec<u8>>),
    Timestamp(Option<DateTime<Utc>>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bool(None)
                | Value::Int(None)
                | Value::Float(None)
                | Value::Text(None)
                | Value::Bytes(None)
                | Value::Timestamp(None)
        )
    }

    /// Whether this is the zero value of its type.
    ///
    /// A zero primary key is left out of INSERT statements so the engine
    /// generates one; zero created/updated timestamps are filled with the
    /// current time.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(Some(v)) => *v == 0,
            Value::Float(Some(v)) => *v == 0.0,
            Value::Text(Some(v)) => v.is_empty(),
            Value::Bytes(Some(v)) => v.is_empty(),
            Value::Bool(Some(v)) => !*v,
            Value::Timestamp(Some(v)) => v.timestamp() == 0 && v.timestamp_subsec_nanos() == 0,
            _ => self.is_null(),
        }
    }
}

macro_rules! impl_from_value {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(Some(v.into()))
            }
        }

        impl From<Option<$ty>> for Value {
            fn from(v: Option<$ty>) -> Self {
                Value::$variant(v.map(Into::into))
            }
        }
    };
}

impl_from_value!(Bool, bool);
impl_from_value!(Int, i8);
impl_from_value!(Int, i16);
impl_from_value!(Int, i32);
impl_from_value!(Int, i64);
impl_from_value!(Int, u8);
impl_from_value!(Int, u16);
impl_from_value!(Int, u32);
impl_from_value!(Float, f32);
impl_from_value!(Float, f64);
impl_from_value!(Text, String);
impl_from_value!(Bytes, Vec<u8>);
impl_from_value!(Timestamp, DateTime<Utc>);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        Value::Text(v.map(str::to_string))
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(Some(v.clone()))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Some(v.to_vec()))
    }
}

/// Build a `Vec<Value>` from heterogeneous arguments.
///
/// ```ignore
/// scope::filter("age > ? AND name = ?", args![22, "alice"])
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),+]
    };
}
