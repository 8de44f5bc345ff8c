//! Values that can be bound to a query placeholder

use crate::path::StoragePath;
use crate::query::Query;
use crate::table::Table;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A value bound to a `$name` placeholder.
///
/// Every supported kind has its own variant. Values of any other kind are
/// carried as [`Binding::Unsupported`] and rejected when the query is
/// rendered.
#[derive(Debug, Clone)]
pub enum Binding {
    /// Nested query, rendered as a parenthesized subquery
    Query(Arc<Query>),
    /// In-memory dataset, rendered as its alias
    Table(Table),
    /// Text, rendered as an escaped string literal
    Text(String),
    /// Local or remote path, rendered as an escaped string literal
    Path(StoragePath),
    Int(i128),
    Float(f64),
    Bool(bool),
    Null,
    /// A value with no SQL rendering
    Unsupported { type_name: String },
}

impl Binding {
    /// Tag a Rust type as an unsupported binding
    pub fn unsupported<T: ?Sized>() -> Self {
        Binding::Unsupported {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &str {
        match self {
            Binding::Query(_) => "query",
            Binding::Table(_) => "table",
            Binding::Text(_) => "text",
            Binding::Path(_) => "path",
            Binding::Int(_) => "integer",
            Binding::Float(_) => "float",
            Binding::Bool(_) => "boolean",
            Binding::Null => "null",
            Binding::Unsupported { type_name } => type_name,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Binding::Null)
    }
}

impl From<Query> for Binding {
    fn from(value: Query) -> Self {
        Binding::Query(Arc::new(value))
    }
}

impl From<Arc<Query>> for Binding {
    fn from(value: Arc<Query>) -> Self {
        Binding::Query(value)
    }
}

impl From<&Arc<Query>> for Binding {
    fn from(value: &Arc<Query>) -> Self {
        Binding::Query(Arc::clone(value))
    }
}

impl From<&Query> for Binding {
    fn from(value: &Query) -> Self {
        Binding::Query(Arc::new(value.clone()))
    }
}

impl From<Table> for Binding {
    fn from(value: Table) -> Self {
        Binding::Table(value)
    }
}

impl From<&Table> for Binding {
    fn from(value: &Table) -> Self {
        Binding::Table(value.clone())
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Binding::Text(value.to_string())
    }
}

impl From<String> for Binding {
    fn from(value: String) -> Self {
        Binding::Text(value)
    }
}

impl From<&String> for Binding {
    fn from(value: &String) -> Self {
        Binding::Text(value.clone())
    }
}

impl From<Cow<'_, str>> for Binding {
    fn from(value: Cow<'_, str>) -> Self {
        Binding::Text(value.into_owned())
    }
}

impl From<StoragePath> for Binding {
    fn from(value: StoragePath) -> Self {
        Binding::Path(value)
    }
}

impl From<&StoragePath> for Binding {
    fn from(value: &StoragePath) -> Self {
        Binding::Path(value.clone())
    }
}

impl From<PathBuf> for Binding {
    fn from(value: PathBuf) -> Self {
        Binding::Path(StoragePath::Local(value))
    }
}

impl From<&Path> for Binding {
    fn from(value: &Path) -> Self {
        Binding::Path(StoragePath::Local(value.to_path_buf()))
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Binding {
                fn from(value: $ty) -> Self {
                    Binding::Int(value as i128)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl From<f32> for Binding {
    /// Widens through the shortest decimal form, so `0.1f32` stays `0.1`
    fn from(value: f32) -> Self {
        let widened = value.to_string().parse::<f64>().unwrap_or(f64::from(value));
        Binding::Float(widened)
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Binding::Float(value)
    }
}

impl From<bool> for Binding {
    fn from(value: bool) -> Self {
        Binding::Bool(value)
    }
}

impl From<()> for Binding {
    fn from(_: ()) -> Self {
        Binding::Null
    }
}

impl<T: Into<Binding>> From<Option<T>> for Binding {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Binding::Null,
        }
    }
}

impl From<serde_json::Value> for Binding {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Binding::Null,
            Value::Bool(b) => Binding::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Binding::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Binding::Int(u as i128)
                } else {
                    Binding::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Binding::Text(s),
            Value::Array(_) => Binding::Unsupported {
                type_name: "array".to_string(),
            },
            Value::Object(_) => Binding::Unsupported {
                type_name: "object".to_string(),
            },
        }
    }
}
