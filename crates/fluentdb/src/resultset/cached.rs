use serde_json::Value;
use std::collections::HashMap;

use crate::connection::{ColumnKey, Cursor, FetchOrientation, FetchStyle, FetchedRow, Row};
use crate::error::{DbError, DbResult};

/// A cursor over rows that are already in memory.
///
/// The position starts before the first row (`-1`). Moves past either end clamp to one-before-start
/// or one-past-end and yield `None`, so a following `Prior` / `Next` lands back on a row.
#[derive(Debug, Clone)]
pub struct CachedResultset {
    rows: Option<Vec<Row>>,
    pointer: i64,
    bindings: HashMap<ColumnKey, Value>,
    fetch_mode: FetchStyle,
}

impl CachedResultset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Some(rows),
            pointer: -1,
            bindings: HashMap::new(),
            fetch_mode: FetchStyle::Map,
        }
    }

    /// The materialized rows, or `None` once the cursor is closed.
    pub fn rows(&self) -> Option<&[Row]> {
        self.rows.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.rows.is_none()
    }

    fn open_rows(&self) -> DbResult<&Vec<Row>> {
        self.rows
            .as_ref()
            .ok_or_else(|| DbError::usage("cached resultset: cursor is closed"))
    }

    fn len(&self) -> i64 {
        self.rows.as_ref().map_or(0, |r| r.len() as i64)
    }

    fn fill_bindings(&mut self, row: &Row) {
        for (key, slot) in self.bindings.iter_mut() {
            *slot = match key {
                ColumnKey::Index(i) => row.values().nth(*i).cloned().unwrap_or(Value::Null),
                ColumnKey::Name(name) => row.get(name).cloned().unwrap_or(Value::Null),
            };
        }
    }
}

impl Cursor for CachedResultset {
    fn fetch(
        &mut self,
        style: FetchStyle,
        orientation: FetchOrientation,
    ) -> DbResult<Option<FetchedRow>> {
        let len = self.open_rows()?.len() as i64;
        self.pointer = match orientation {
            FetchOrientation::Next => self.pointer.saturating_add(1),
            FetchOrientation::Prior => self.pointer.saturating_sub(1),
            FetchOrientation::First => 0,
            FetchOrientation::Last => len - 1,
            FetchOrientation::Absolute(n) => n,
            FetchOrientation::Relative(n) => self.pointer.saturating_add(n),
        };

        if self.pointer >= len {
            self.pointer = len;
            return Ok(None);
        }
        if self.pointer < 0 {
            self.pointer = -1;
            return Ok(None);
        }

        let row = self.open_rows()?[self.pointer as usize].clone();
        if style == FetchStyle::Bound {
            self.fill_bindings(&row);
        }
        Ok(Some(FetchedRow::from_row(&row, style)))
    }

    /// Remaining rows from the current position; the cursor ends up past the last row.
    fn fetch_all(&mut self, style: FetchStyle) -> DbResult<Vec<FetchedRow>> {
        let rows = self.open_rows()?;
        let start = (self.pointer + 1).max(0) as usize;
        let out = rows
            .iter()
            .skip(start)
            .map(|row| FetchedRow::from_row(row, style))
            .collect();
        self.pointer = self.len();
        Ok(out)
    }

    fn fetch_mode(&self) -> FetchStyle {
        self.fetch_mode
    }

    fn set_fetch_mode(&mut self, style: FetchStyle) -> DbResult<()> {
        self.open_rows()?;
        self.fetch_mode = style;
        Ok(())
    }

    fn row_count(&mut self) -> DbResult<u64> {
        Ok(self.open_rows()?.len() as u64)
    }

    /// Columns of the current row, or of the first row before the first fetch.
    fn column_count(&mut self) -> DbResult<usize> {
        let rows = self.open_rows()?;
        let idx = self.pointer.max(0) as usize;
        let row = rows.get(idx).or_else(|| rows.last());
        Ok(row.map_or(0, |row| row.len()))
    }

    fn bind_column(&mut self, key: ColumnKey) -> DbResult<()> {
        self.open_rows()?;
        self.bindings.insert(key, Value::Null);
        Ok(())
    }

    fn bound_value(&self, key: &ColumnKey) -> Option<Value> {
        self.bindings.get(key).cloned()
    }

    fn close_cursor(&mut self) -> DbResult<()> {
        self.rows = None;
        Ok(())
    }

    fn bind_param(&mut self, _param: &str, _value: crate::value::SqlValue) -> DbResult<()> {
        Err(DbError::unsupported("a cached result cannot be a prepared statement"))
    }

    fn bind_value(&mut self, _param: &str, _value: crate::value::SqlValue) -> DbResult<()> {
        Err(DbError::unsupported("a cached result cannot be a prepared statement"))
    }

    fn execute(&mut self) -> DbResult<()> {
        Err(DbError::unsupported("a cached result cannot be a prepared statement"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rs(n: i64) -> CachedResultset {
        CachedResultset::new(
            (0..n)
                .map(|i| {
                    let mut row = Row::new();
                    row.insert("id".into(), json!(i));
                    row.insert("name".into(), json!(format!("n{i}")));
                    row
                })
                .collect(),
        )
    }

    fn id(row: Option<FetchedRow>) -> Option<i64> {
        match row? {
            FetchedRow::Map(map) => map.get("id").and_then(Value::as_i64),
            _ => None,
        }
    }

    #[test]
    fn next_walks_and_clamps_past_end() {
        let mut rs = rs(2);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), Some(0));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), Some(1));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), None);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), None);
        // clamped at one-past-end, so one step back is the last row
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Prior).unwrap()), Some(1));
    }

    #[test]
    fn prior_clamps_before_start() {
        let mut rs = rs(3);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Relative(-5)).unwrap()), None);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), Some(0));
    }

    #[test]
    fn relative_moves_saturate_instead_of_overflowing() {
        let mut rs = rs(3);
        rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap();
        rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap();
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Relative(i64::MAX)).unwrap()), None);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Prior).unwrap()), Some(2));

        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Relative(i64::MIN)).unwrap()), None);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), Some(0));

        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Absolute(i64::MAX)).unwrap()), None);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap()), None);
    }

    #[test]
    fn fetch_mode_sets_the_default_style() {
        let mut rs = rs(3);
        assert_eq!(rs.fetch_mode(), FetchStyle::Map);
        assert_eq!(id(rs.fetch_next().unwrap()), Some(0));

        rs.set_fetch_mode(FetchStyle::List).unwrap();
        assert_eq!(rs.fetch_next().unwrap(), Some(FetchedRow::List(vec![json!(1), json!("n1")])));
        assert_eq!(
            rs.fetch_remaining().unwrap(),
            vec![FetchedRow::List(vec![json!(2), json!("n2")])]
        );

        rs.close_cursor().unwrap();
        assert!(rs.set_fetch_mode(FetchStyle::Map).unwrap_err().is_usage());
    }

    #[test]
    fn absolute_first_last() {
        let mut rs = rs(5);
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Absolute(3)).unwrap()), Some(3));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::First).unwrap()), Some(0));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Last).unwrap()), Some(4));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Relative(-2)).unwrap()), Some(2));
        assert_eq!(id(rs.fetch(FetchStyle::Map, FetchOrientation::Absolute(9)).unwrap()), None);
    }

    #[test]
    fn fetch_styles() {
        let mut rs = rs(1);
        let row = rs.fetch(FetchStyle::List, FetchOrientation::First).unwrap();
        assert_eq!(row, Some(FetchedRow::List(vec![json!(0), json!("n0")])));

        let row = rs.fetch(FetchStyle::Both, FetchOrientation::First).unwrap().unwrap();
        let FetchedRow::Both { map, list } = row else {
            panic!("expected both");
        };
        assert_eq!(map.get("name"), Some(&json!("n0")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn bound_fetch_fills_registered_columns() {
        let mut rs = rs(2);
        rs.bind_column(ColumnKey::from("name")).unwrap();
        rs.bind_column(ColumnKey::from(0)).unwrap();
        assert_eq!(rs.bound_value(&ColumnKey::from("name")), Some(Value::Null));

        let row = rs.fetch(FetchStyle::Bound, FetchOrientation::Last).unwrap();
        assert_eq!(row, Some(FetchedRow::Bound));
        assert_eq!(rs.bound_value(&ColumnKey::from("name")), Some(json!("n1")));
        assert_eq!(rs.bound_value(&ColumnKey::from(0)), Some(json!(1)));
        assert_eq!(rs.bound_value(&ColumnKey::from("id")), None);
    }

    #[test]
    fn fetch_all_returns_remaining_rows() {
        let mut rs = rs(4);
        rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap();
        let rest = rs.fetch_all(FetchStyle::Map).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap().is_none());
        assert_eq!(rs.row_count().unwrap(), 4);
    }

    #[test]
    fn fetch_column_reads_next_row() {
        let mut rs = rs(2);
        assert_eq!(rs.fetch_column(1).unwrap(), Some(json!("n0")));
        assert_eq!(rs.fetch_column(0).unwrap(), Some(json!(1)));
        assert_eq!(rs.fetch_column(0).unwrap(), None);
    }

    #[test]
    fn column_count_uses_first_row_before_fetching() {
        let mut rs = rs(1);
        assert_eq!(rs.column_count().unwrap(), 2);
        assert_eq!(CachedResultset::new(Vec::new()).column_count().unwrap(), 0);
    }

    #[test]
    fn closed_cursor_rejects_fetches() {
        let mut rs = rs(1);
        rs.close_cursor().unwrap();
        assert!(rs.is_closed());
        let err = rs.fetch(FetchStyle::Map, FetchOrientation::Next).unwrap_err();
        assert!(err.is_usage());
        assert!(rs.row_count().unwrap_err().is_usage());
    }

    #[test]
    fn prepared_statement_operations_are_unsupported() {
        let mut rs = rs(1);
        assert!(rs.execute().unwrap_err().is_unsupported());
        assert!(rs.bind_value(":id", 1.into()).unwrap_err().is_unsupported());
        assert!(rs.bind_param(":id", 1.into()).unwrap_err().is_unsupported());
    }
}
