//! Values accepted by the builders and the value preparer.

use crate::function::FilterFunction;

/// Type hint forwarded to the driver's native quoting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamType {
    #[default]
    Str,
    Int,
    Bool,
    Null,
    Lob,
}

/// A value headed for a SQL statement.
///
/// Every escaping site matches on this enum; [`SqlValue::Func`] values render themselves as raw
/// SQL and are never escaped.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<SqlValue>),
    Func(FilterFunction),
}

impl SqlValue {
    /// `true` for integers and for the text `"0"`; both render unquoted.
    pub fn is_integer_literal(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Text(s) => s == "0",
            _ => false,
        }
    }

    /// `true` only for empty text.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            obj @ Value::Object(_) => Self::Text(obj.to_string()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::Int(v as i64)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<FilterFunction> for SqlValue {
    fn from(v: FilterFunction) -> Self {
        Self::Func(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// One row of column → value pairs for INSERT / UPDATE, in insertion order.
///
/// # Example
/// ```ignore
/// let row = RowValues::new().set("id", FilterFunction::Uuid).set("name", "alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues {
    cells: Vec<(String, SqlValue)>,
}

impl RowValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value. Setting the same column twice replaces the earlier value in place.
    pub fn set(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<SqlValue>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<SqlValue>> FromIterator<(K, V)> for RowValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RowValues::new();
        for (k, v) in iter {
            row.insert(k.as_ref(), v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_literal_detection_is_typed() {
        assert!(SqlValue::Int(42).is_integer_literal());
        assert!(SqlValue::from("0").is_integer_literal());
        assert!(!SqlValue::from("00").is_integer_literal());
        assert!(!SqlValue::from("42").is_integer_literal());
        assert!(!SqlValue::Float(0.0).is_integer_literal());
    }

    #[test]
    fn empty_string_detection_is_typed() {
        assert!(SqlValue::from("").is_empty_string());
        assert!(!SqlValue::Null.is_empty_string());
        assert!(!SqlValue::Bool(false).is_empty_string());
        assert!(!SqlValue::Int(0).is_empty_string());
    }

    #[test]
    fn json_values_convert() {
        assert_eq!(SqlValue::from(json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from(json!(7)), SqlValue::Int(7));
        assert_eq!(SqlValue::from(json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(
            SqlValue::from(json!(["a", 1])),
            SqlValue::List(vec![SqlValue::from("a"), SqlValue::Int(1)])
        );
        assert_eq!(SqlValue::from(json!({"k": 1})), SqlValue::from(r#"{"k":1}"#));
    }

    #[test]
    fn row_values_keep_order_and_replace_in_place() {
        let row = RowValues::new().set("b", 1).set("a", "x").set("b", 2);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.get("b"), Some(&SqlValue::Int(2)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::from("x"));
    }
}
