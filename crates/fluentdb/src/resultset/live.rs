use serde_json::Value;
use std::time::Duration;

use super::CachedResultset;
use crate::connection::{ColumnKey, Cursor, FetchOrientation, FetchStyle, FetchedRow, Row};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::value::SqlValue;

/// How a [`LiveResultset`] obtained its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing has been fetched yet.
    Uninitialized,
    /// Rows came from the cache; the database was not queried.
    CacheHit,
    /// Rows stream from the driver's cursor.
    LiveExecuted,
    /// The query ran, and its rows were materialized and handed to the cache.
    LiveThenCached,
}

/// A lazily executed query.
///
/// Nothing happens until the first cursor operation. At that point the resultset either serves
/// the rows from the cache, or runs the query. A keyed result with fewer rows than
/// [`DbConfig::cache_row_threshold`](crate::DbConfig::cache_row_threshold) is materialized and
/// stored; anything larger streams from the driver.
pub struct LiveResultset<'db> {
    db: &'db Database,
    sql: String,
    cache_key: Option<String>,
    ttl: Duration,
    resolution: Resolution,
    cursor: Option<Box<dyn Cursor>>,
    fetch_mode: FetchStyle,
}

impl<'db> LiveResultset<'db> {
    pub(crate) fn new(
        db: &'db Database,
        sql: String,
        cache_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            db,
            sql,
            cache_key,
            ttl,
            resolution: Resolution::Uninitialized,
            cursor: None,
            fetch_mode: FetchStyle::Map,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Run the query (or read the cache) now instead of on first fetch.
    pub fn resolve(&mut self) -> DbResult<Resolution> {
        self.cursor()?;
        Ok(self.resolution)
    }

    fn cursor(&mut self) -> DbResult<&mut (dyn Cursor + 'static)> {
        if self.cursor.is_none() {
            let (cursor, resolution) = self.open()?;
            self.cursor = Some(cursor);
            self.resolution = resolution;
        }
        self.cursor
            .as_deref_mut()
            .ok_or_else(|| DbError::usage("resultset has no cursor"))
    }

    fn open(&self) -> DbResult<(Box<dyn Cursor>, Resolution)> {
        if let Some(rows) = self.read_cache() {
            return Ok((Box::new(CachedResultset::new(rows)), Resolution::CacheHit));
        }

        let mut live = self.db.query_live(&self.sql)?;
        if let Some(key) = &self.cache_key {
            let count = live.row_count()?;
            if count < self.db.config().cache_row_threshold as u64 {
                let rows = live.fetch_rows()?;
                drop(live);
                self.write_cache(key, &rows);
                return Ok((Box::new(CachedResultset::new(rows)), Resolution::LiveThenCached));
            }
            tracing::trace!(
                target: "fluentdb.cache",
                key = %key,
                rows = count,
                "result too large to cache"
            );
        }
        Ok((live, Resolution::LiveExecuted))
    }

    fn read_cache(&self) -> Option<Vec<Row>> {
        let key = self.cache_key.as_deref()?;
        let cache = self.db.cache()?;
        match cache.get(key, Some(self.ttl)) {
            Ok(Some(rows)) => {
                tracing::trace!(target: "fluentdb.cache", key = %key, rows = rows.len(), "cache hit");
                Some(rows)
            }
            Ok(None) => {
                tracing::trace!(target: "fluentdb.cache", key = %key, "cache miss");
                None
            }
            Err(err) => {
                tracing::warn!(target: "fluentdb.cache", key = %key, error = %err, "cache read failed");
                None
            }
        }
    }

    fn write_cache(&self, key: &str, rows: &[Row]) {
        if self.ttl.as_secs() < 1 {
            return;
        }
        let Some(cache) = self.db.cache() else {
            return;
        };
        if let Err(err) = cache.set(key, rows, self.ttl) {
            tracing::warn!(target: "fluentdb.cache", key = %key, error = %err, "cache write failed");
        }
    }
}

impl std::fmt::Debug for LiveResultset<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveResultset")
            .field("sql", &self.sql)
            .field("cache_key", &self.cache_key)
            .field("ttl", &self.ttl)
            .field("resolution", &self.resolution)
            .field("fetch_mode", &self.fetch_mode)
            .finish()
    }
}

impl Cursor for LiveResultset<'_> {
    fn fetch(
        &mut self,
        style: FetchStyle,
        orientation: FetchOrientation,
    ) -> DbResult<Option<FetchedRow>> {
        self.cursor()?.fetch(style, orientation)
    }

    fn fetch_all(&mut self, style: FetchStyle) -> DbResult<Vec<FetchedRow>> {
        self.cursor()?.fetch_all(style)
    }

    fn fetch_column(&mut self, index: usize) -> DbResult<Option<Value>> {
        self.cursor()?.fetch_column(index)
    }

    fn fetch_mode(&self) -> FetchStyle {
        self.fetch_mode
    }

    /// Stored on the resultset; does not run the query.
    fn set_fetch_mode(&mut self, style: FetchStyle) -> DbResult<()> {
        self.fetch_mode = style;
        Ok(())
    }

    fn row_count(&mut self) -> DbResult<u64> {
        self.cursor()?.row_count()
    }

    fn column_count(&mut self) -> DbResult<usize> {
        self.cursor()?.column_count()
    }

    fn bind_column(&mut self, key: ColumnKey) -> DbResult<()> {
        self.cursor()?.bind_column(key)
    }

    fn bound_value(&self, key: &ColumnKey) -> Option<Value> {
        self.cursor.as_ref()?.bound_value(key)
    }

    /// Closing a resultset that never ran does not run it; later fetches fail as closed.
    fn close_cursor(&mut self) -> DbResult<()> {
        let cursor = self
            .cursor
            .get_or_insert_with(|| Box::new(CachedResultset::new(Vec::new())));
        cursor.close_cursor()
    }

    fn bind_param(&mut self, param: &str, value: SqlValue) -> DbResult<()> {
        self.cursor()?.bind_param(param, value)
    }

    fn bind_value(&mut self, param: &str, value: SqlValue) -> DbResult<()> {
        self.cursor()?.bind_value(param, value)
    }

    fn execute(&mut self) -> DbResult<()> {
        self.cursor()?.execute()
    }
}
