//! SELECT statement builder.

use std::time::Duration;

use serde_json::Value;

use crate::connection::{Cursor, FetchOrientation, FetchStyle};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::qb::column::ColumnRef;
use crate::qb::core::{QbCore, impl_order_limit_methods, impl_where_methods};
use crate::qb::table::{JoinType, TableRef};
use crate::qb::traits::SqlQb;
use crate::resultset::LiveResultset;

/// SELECT statement builder.
///
/// Columns may carry aliases and any number of tables may be listed or joined.
#[derive(Debug, Clone)]
pub struct SelectQb<'db> {
    core: QbCore<'db>,
    distinct: bool,
}

impl<'db> SelectQb<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            core: QbCore::new(db, "SELECT", true, true),
            distinct: false,
        }
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    // ==================== Columns ====================

    /// Add columns; a bare name belongs to the most recently added table.
    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        for column in columns {
            self.core.add_column(column.into());
        }
        self
    }

    pub fn column(mut self, column: impl Into<ColumnRef>) -> Self {
        self.core.add_column(column.into());
        self
    }

    // ==================== Tables ====================

    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.core
            .join(table.into(), None, None, None, JoinType::Inner);
        self
    }

    pub fn from_as(mut self, table: impl Into<TableRef>, alias: &str) -> Self {
        self.core
            .join(table.into(), Some(alias), None, None, JoinType::Inner);
        self
    }

    /// Add a table. With `id_column` it is joined on `alias.id_column = relation`, the relation
    /// defaulting to the previous table's column of the same name.
    pub fn join(
        mut self,
        table: impl Into<TableRef>,
        alias: Option<&str>,
        id_column: Option<&str>,
        relation: Option<ColumnRef>,
        join_type: JoinType,
    ) -> Self {
        self.core
            .join(table.into(), alias, id_column, relation, join_type);
        self
    }

    pub fn inner_join(self, table: impl Into<TableRef>, id_column: &str) -> Self {
        self.join(table, None, Some(id_column), None, JoinType::Inner)
    }

    pub fn left_outer_join(self, table: impl Into<TableRef>, id_column: &str) -> Self {
        self.join(table, None, Some(id_column), None, JoinType::LeftOuter)
    }

    // ==================== Rendering ====================

    /// `SELECT COUNT(*) AS RowCount` over the same tables and conditions.
    pub fn count_sql(&self) -> DbResult<String> {
        self.render(true)
    }

    fn render(&self, count: bool) -> DbResult<String> {
        self.core.check()?;
        let tables = self.core.table_list("FROM")?;

        let mut parts: Vec<String> = vec!["SELECT".to_string()];
        if count {
            parts.push("COUNT(*) AS RowCount".to_string());
        } else {
            parts.push(if self.distinct { "DISTINCT" } else { "" }.to_string());
            parts.extend(self.core.top_sql());
            parts.push(if self.core.columns.is_empty() {
                "*".to_string()
            } else {
                self.core
                    .columns
                    .iter()
                    .map(|c| c.full.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            });
        }

        parts.push("FROM".to_string());
        parts.push(tables);

        let where_sql = self.core.where_sql();
        if !where_sql.is_empty() {
            parts.push(where_sql);
        }

        if !count {
            let order_sql = self.core.order_sql();
            if !order_sql.is_empty() {
                parts.push(order_sql);
            }
            parts.extend(self.core.paging_sql());
        }

        Ok(parts.join(" "))
    }

    // ==================== Execution ====================

    /// Lazily run the statement; cached when a batch scope is active.
    pub fn query(&self) -> DbResult<LiveResultset<'db>> {
        Ok(self.core.db.query(self.build_query()?))
    }

    /// Lazily run the statement, caching the result under `key` for `ttl`.
    pub fn query_cached(&self, key: impl Into<String>, ttl: Duration) -> DbResult<LiveResultset<'db>> {
        Ok(self.core.db.query_cached(self.build_query()?, key, ttl))
    }

    /// Number of rows the statement would return, ignoring pagination.
    pub fn query_count(&self) -> DbResult<u64> {
        let mut rs = self.core.db.query(self.count_sql()?);
        let row = rs
            .fetch(FetchStyle::Map, FetchOrientation::Next)?
            .and_then(|r| r.into_map());
        let Some(row) = row else {
            return Ok(0);
        };
        match row.get("RowCount") {
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| DbError::driver(format!("invalid RowCount {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| DbError::driver(format!("invalid RowCount '{s}'"))),
            _ => Err(DbError::driver("count query returned no RowCount column")),
        }
    }
}

impl_where_methods!(SelectQb);
impl_order_limit_methods!(SelectQb);

impl SqlQb for SelectQb<'_> {
    fn build_query(&self) -> DbResult<String> {
        self.render(false)
    }

    fn database(&self) -> &Database {
        self.core.db
    }
}
