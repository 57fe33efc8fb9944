//! UPDATE statement builder.

use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::qb::column::ColumnRef;
use crate::qb::core::{QbCore, impl_filter_methods, impl_order_limit_methods, impl_where_methods};
use crate::qb::table::{JoinType, TableRef};
use crate::qb::traits::{MutationQb, SqlQb};
use crate::value::RowValues;

/// UPDATE statement builder.
///
/// Joined (multi-table) updates are only available on the generic dialect.
#[derive(Debug, Clone)]
pub struct UpdateQb<'db> {
    core: QbCore<'db>,
}

impl<'db> UpdateQb<'db> {
    pub fn new(db: &'db Database) -> Self {
        let multi_table = db.dialect() == Dialect::Generic;
        Self {
            core: QbCore::new(db, "UPDATE", false, multi_table),
        }
    }

    /// The target table, aliased `T`.
    pub fn table(mut self, table: impl Into<TableRef>) -> Self {
        self.core
            .join(table.into(), Some("T"), None, None, JoinType::Inner);
        self
    }

    /// Join another table into the update.
    pub fn join(
        mut self,
        table: impl Into<TableRef>,
        alias: Option<&str>,
        id_column: Option<&str>,
        relation: Option<ColumnRef>,
        join_type: JoinType,
    ) -> Self {
        if self.core.dialect() == Dialect::TSql {
            self.core
                .record(DbError::unsupported("joined UPDATE on T-SQL"));
        } else {
            self.core
                .join(table.into(), alias, id_column, relation, join_type);
        }
        self
    }

    /// The new values. An UPDATE takes a single row.
    pub fn values(mut self, row: RowValues) -> Self {
        if self.core.rows.is_empty() {
            self.core.rows.push(row);
        } else {
            self.core.record(DbError::usage("can only use one row"));
        }
        self
    }

    /// Set a single column.
    pub fn set(mut self, column: &str, value: impl Into<crate::value::SqlValue>) -> Self {
        match self.core.rows.first_mut() {
            Some(row) => row.insert(column, value),
            None => self.core.rows.push(RowValues::new().set(column, value)),
        }
        self
    }
}

impl_filter_methods!(UpdateQb);
impl_where_methods!(UpdateQb);
impl_order_limit_methods!(UpdateQb);

impl SqlQb for UpdateQb<'_> {
    fn build_query(&self) -> DbResult<String> {
        self.core.check()?;
        let tables = self.core.table_list("TABLE")?;
        let rows = self.core.prepare_rows()?;
        let Some(values) = rows.values.first() else {
            return Err(DbError::configuration("UPDATE: no values to set"));
        };

        let assignments: Vec<String> = rows
            .columns
            .iter()
            .zip(values)
            .map(|(col, value)| format!("{col} = {value}"))
            .collect();

        let mut parts = vec!["UPDATE".to_string()];
        parts.extend(self.core.top_sql());
        parts.push(tables);
        parts.push("SET".to_string());
        parts.push(assignments.join(","));

        let where_sql = self.core.where_sql();
        if !where_sql.is_empty() {
            parts.push(where_sql);
        }
        let order_sql = self.core.order_sql();
        if !order_sql.is_empty() {
            parts.push(order_sql);
        }
        parts.extend(self.core.paging_sql());

        Ok(parts.join(" "))
    }

    fn database(&self) -> &Database {
        self.core.db
    }
}

impl MutationQb for UpdateQb<'_> {}
