//! Driver-facing traits.
//!
//! [`RawConnection`] is what a database driver provides; [`Cursor`] is what both drivers and the
//! caching resultsets hand back to callers.

use serde_json::Value;

use crate::error::{DbError, DbResult};
use crate::value::{ParamType, SqlValue};

/// One materialized row, column name → value, in select order.
pub type Row = serde_json::Map<String, Value>;

/// A raw connection to a relational database.
///
/// Only the first four methods are required. Transactions and attributes default to
/// [`DbError::Unsupported`].
pub trait RawConnection: Send + Sync {
    /// Run a statement, returning the affected row count.
    fn execute(&self, sql: &str) -> DbResult<u64>;

    /// Run a query, returning a live cursor.
    fn query(&self, sql: &str) -> DbResult<Box<dyn Cursor>>;

    /// Quote a string literal natively. `None` means the driver cannot quote.
    fn quote(&self, value: &str, param_type: ParamType) -> Option<String>;

    fn last_insert_id(&self) -> DbResult<String>;

    fn begin_transaction(&self) -> DbResult<()> {
        Err(DbError::unsupported("begin_transaction"))
    }

    fn commit(&self) -> DbResult<()> {
        Err(DbError::unsupported("commit"))
    }

    fn roll_back(&self) -> DbResult<()> {
        Err(DbError::unsupported("roll_back"))
    }

    fn get_attribute(&self, name: &str) -> DbResult<Value> {
        Err(DbError::unsupported(format!("get_attribute({name})")))
    }

    fn set_attribute(&self, name: &str, _value: Value) -> DbResult<()> {
        Err(DbError::unsupported(format!("set_attribute({name})")))
    }
}

/// Shape of a fetched row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStyle {
    /// Column name → value.
    #[default]
    Map,
    /// Values in column order.
    List,
    /// Both of the above.
    Both,
    /// Write into the bound columns and return [`FetchedRow::Bound`].
    Bound,
}

/// Cursor movement for a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchOrientation {
    #[default]
    Next,
    Prior,
    First,
    Last,
    /// Zero-based row index.
    Absolute(i64),
    /// Offset from the current row.
    Relative(i64),
}

/// A column addressed by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnKey {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Result of a single fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedRow {
    Map(Row),
    List(Vec<Value>),
    Both { map: Row, list: Vec<Value> },
    /// The bound columns were filled.
    Bound,
}

impl FetchedRow {
    /// Render a materialized row in the requested style.
    ///
    /// [`FetchStyle::Bound`] is handled by the cursor and maps to [`FetchedRow::Bound`] here.
    pub fn from_row(row: &Row, style: FetchStyle) -> Self {
        match style {
            FetchStyle::Map => Self::Map(row.clone()),
            FetchStyle::List => Self::List(row.values().cloned().collect()),
            FetchStyle::Both => Self::Both {
                map: row.clone(),
                list: row.values().cloned().collect(),
            },
            FetchStyle::Bound => Self::Bound,
        }
    }

    /// The row as a map, when fetched in a style that carries names.
    pub fn into_map(self) -> Option<Row> {
        match self {
            Self::Map(map) | Self::Both { map, .. } => Some(map),
            _ => None,
        }
    }
}

/// A forward (and, for materialized results, scrollable) cursor over query results.
pub trait Cursor: Send {
    fn fetch(
        &mut self,
        style: FetchStyle,
        orientation: FetchOrientation,
    ) -> DbResult<Option<FetchedRow>>;

    /// Style used by [`fetch_next`](Cursor::fetch_next) and
    /// [`fetch_remaining`](Cursor::fetch_remaining).
    fn fetch_mode(&self) -> FetchStyle {
        FetchStyle::Map
    }

    fn set_fetch_mode(&mut self, style: FetchStyle) -> DbResult<()> {
        Err(DbError::unsupported(format!("set_fetch_mode({style:?})")))
    }

    /// Next row in the default fetch mode.
    fn fetch_next(&mut self) -> DbResult<Option<FetchedRow>> {
        let style = self.fetch_mode();
        self.fetch(style, FetchOrientation::Next)
    }

    /// Every remaining row in the default fetch mode.
    fn fetch_remaining(&mut self) -> DbResult<Vec<FetchedRow>> {
        let style = self.fetch_mode();
        self.fetch_all(style)
    }

    /// Fetch every remaining row.
    fn fetch_all(&mut self, style: FetchStyle) -> DbResult<Vec<FetchedRow>> {
        let mut out = Vec::new();
        while let Some(row) = self.fetch(style, FetchOrientation::Next)? {
            out.push(row);
        }
        Ok(out)
    }

    /// Fetch every remaining row as maps, whatever the fetch mode.
    fn fetch_rows(&mut self) -> DbResult<Vec<Row>> {
        Ok(self
            .fetch_all(FetchStyle::Map)?
            .into_iter()
            .filter_map(FetchedRow::into_map)
            .collect())
    }

    /// Read column `index` from the next row.
    fn fetch_column(&mut self, index: usize) -> DbResult<Option<Value>> {
        match self.fetch(FetchStyle::List, FetchOrientation::Next)? {
            Some(FetchedRow::List(values)) => Ok(Some(values.get(index).cloned().unwrap_or(Value::Null))),
            _ => Ok(None),
        }
    }

    /// Rows in the result (or affected, for drivers that only know that).
    fn row_count(&mut self) -> DbResult<u64>;

    fn column_count(&mut self) -> DbResult<usize>;

    /// Register a column for [`FetchStyle::Bound`] fetches.
    fn bind_column(&mut self, key: ColumnKey) -> DbResult<()>;

    /// Value written into a bound column by the last bound fetch.
    fn bound_value(&self, key: &ColumnKey) -> Option<Value>;

    fn close_cursor(&mut self) -> DbResult<()>;

    fn bind_param(&mut self, param: &str, _value: SqlValue) -> DbResult<()> {
        Err(DbError::unsupported(format!("bind_param({param})")))
    }

    fn bind_value(&mut self, param: &str, _value: SqlValue) -> DbResult<()> {
        Err(DbError::unsupported(format!("bind_value({param})")))
    }

    fn execute(&mut self) -> DbResult<()> {
        Err(DbError::unsupported("execute"))
    }
}
