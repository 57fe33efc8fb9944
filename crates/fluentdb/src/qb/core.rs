//! State shared by every statement builder.

use std::collections::HashMap;

use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::qb::column::{ColumnRef, ResolvedColumn};
use crate::qb::filter::{self, CompareOp, Limit, OrderItem, Predicate};
use crate::qb::rows::{FilterRule, PreparedRows, RowEncoder};
use crate::qb::table::{self, JoinClause, JoinType, TableEntry, TableRef};
use crate::value::{RowValues, SqlValue};

/// Accumulated statement state.
///
/// Errors raised while chaining are kept (first one wins) and reported when the statement is
/// built, so the fluent chain never has to return `Result`.
#[derive(Debug, Clone)]
pub(crate) struct QbCore<'db> {
    pub db: &'db Database,
    kind: &'static str,
    allow_column_alias: bool,
    allow_multi_table: bool,
    pub tables: Vec<TableEntry>,
    last_alias: Option<String>,
    pub columns: Vec<ResolvedColumn>,
    predicates: Vec<Predicate>,
    order: Vec<OrderItem>,
    pub limit: Option<Limit>,
    pub rows: Vec<RowValues>,
    filters: HashMap<String, FilterRule>,
    build_error: Option<DbError>,
}

impl<'db> QbCore<'db> {
    pub fn new(
        db: &'db Database,
        kind: &'static str,
        allow_column_alias: bool,
        allow_multi_table: bool,
    ) -> Self {
        Self {
            db,
            kind,
            allow_column_alias,
            allow_multi_table,
            tables: Vec::new(),
            last_alias: None,
            columns: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            rows: Vec::new(),
            filters: HashMap::new(),
            build_error: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    /// Keep the first chaining error.
    pub fn record(&mut self, err: DbError) {
        if self.build_error.is_none() {
            self.build_error = Some(err.context(self.kind));
        }
    }

    pub fn check(&self) -> DbResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // ==================== Tables ====================

    /// Add a table, deriving its alias when none is given.
    ///
    /// With `id_column`, the table is joined on `alias.id_column = <relation>`, where the
    /// relation defaults to the same-named column of the previously added table.
    pub fn join(
        &mut self,
        table: TableRef,
        alias: Option<&str>,
        id_column: Option<&str>,
        relation: Option<ColumnRef>,
        join_type: JoinType,
    ) {
        if let Err(err) = self.try_join(table, alias, id_column, relation, join_type) {
            self.record(err);
        }
    }

    fn try_join(
        &mut self,
        table: TableRef,
        alias: Option<&str>,
        id_column: Option<&str>,
        relation: Option<ColumnRef>,
        join_type: JoinType,
    ) -> DbResult<()> {
        let alias = table::derive_alias(alias, &table.table, &self.tables)?;
        let dialect = self.dialect();

        let join = match id_column.filter(|c| !c.is_empty()) {
            None => None,
            Some(id) => {
                let join_to = match (&relation, &self.last_alias) {
                    (Some(rel), _) => self.resolve(rel).escaped,
                    (None, Some(last)) => {
                        format!("{}.{}", dialect.quote_ident(last), dialect.quote_ident(id))
                    }
                    (None, None) => {
                        return Err(DbError::usage(format!(
                            "cannot join '{}' on '{id}' without a previous table",
                            table.table
                        )));
                    }
                };
                Some(JoinClause {
                    id_column: id.to_string(),
                    join_to,
                    join_type,
                })
            }
        };

        self.tables.push(TableEntry {
            alias: alias.clone(),
            table,
            join,
        });
        self.last_alias = Some(alias);
        Ok(())
    }

    pub fn table_list(&self, required: &str) -> DbResult<String> {
        table::build_table_list(&self.tables, self.dialect(), self.allow_multi_table, required)
    }

    // ==================== Columns ====================

    pub fn resolve(&self, col: &ColumnRef) -> ResolvedColumn {
        ResolvedColumn::resolve(
            col,
            self.last_alias.as_deref(),
            self.dialect(),
            self.allow_multi_table,
            self.allow_column_alias,
        )
    }

    pub fn add_column(&mut self, col: ColumnRef) {
        let resolved = self.resolve(&col);
        if !self.columns.iter().any(|c| c.full == resolved.full) {
            self.columns.push(resolved);
        }
    }

    // ==================== WHERE / ORDER / LIMIT ====================

    pub fn where_raw(&mut self, sql: &str) {
        self.predicates.push(Predicate::Raw(sql.to_string()));
    }

    pub fn where_cmp(&mut self, col: ColumnRef, op: CompareOp, value: SqlValue) {
        let column = self.resolve(&col).escaped;
        match Predicate::compare(column, op, value) {
            Ok(predicate) => self.predicates.push(predicate),
            Err(err) => self.record(err),
        }
    }

    pub fn where_op(&mut self, col: ColumnRef, op: &str, value: SqlValue) {
        match op.parse::<CompareOp>() {
            Ok(op) => self.where_cmp(col, op, value),
            Err(err) => self.record(err),
        }
    }

    pub fn where_sql(&self) -> String {
        filter::build_where(&self.predicates, &self.db.preparer())
    }

    /// `DESC` (any case) sorts descending; anything else ascending.
    pub fn order(&mut self, col: ColumnRef, direction: &str) {
        let column = self.resolve(&col).escaped;
        self.order.push(OrderItem::Column {
            column,
            descending: direction.trim().eq_ignore_ascii_case("DESC"),
        });
    }

    pub fn order_direct(&mut self, sql: &str) {
        self.order.push(OrderItem::Raw(sql.to_string()));
    }

    pub fn reset_order(&mut self) {
        self.order.clear();
    }

    pub fn is_ordered(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn order_sql(&self) -> String {
        filter::build_order(&self.order)
    }

    /// `TOP n` on T-SQL when the limit has no offset.
    pub fn top_sql(&self) -> Option<String> {
        match (self.dialect(), self.limit) {
            (Dialect::TSql, Some(l)) if l.offset == 0 => Some(format!("TOP {}", l.count)),
            _ => None,
        }
    }

    /// Trailing pagination: `LIMIT o, n`, or T-SQL `OFFSET .. FETCH` (which needs an ORDER BY).
    pub fn paging_sql(&self) -> Option<String> {
        match (self.dialect(), self.limit) {
            (Dialect::Generic, Some(l)) => Some(format!("LIMIT {}, {}", l.offset, l.count)),
            (Dialect::TSql, Some(l)) if l.offset > 0 => {
                let fetch = format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", l.offset, l.count);
                Some(if self.is_ordered() {
                    fetch
                } else {
                    format!("ORDER BY 1 {fetch}")
                })
            }
            _ => None,
        }
    }

    pub fn limit_args(&mut self, args: &[i64]) {
        match Limit::from_args(args) {
            Ok(limit) => self.limit = Some(limit),
            Err(err) => self.record(err),
        }
    }

    // ==================== Rows ====================

    pub fn filter(&mut self, column: &str, rule: FilterRule) {
        self.filters.entry(column.to_string()).or_default().merge(rule);
    }

    /// Encode the accumulated rows. Without explicit columns, the first row's keys are used.
    pub fn prepare_rows(&self) -> DbResult<PreparedRows> {
        let inferred;
        let columns = if self.columns.is_empty() {
            inferred = self
                .rows
                .first()
                .map(|row| {
                    row.columns()
                        .map(|c| self.resolve(&ColumnRef::from(c)))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            &inferred
        } else {
            &self.columns
        };

        RowEncoder {
            preparer: self.db.preparer(),
            uuid_source: self.db.config().uuid_source,
            filters: &self.filters,
        }
        .encode(columns, &self.rows)
        .map_err(|e| e.context(self.kind))
    }
}

/// WHERE methods shared by SELECT, UPDATE and DELETE.
macro_rules! impl_where_methods {
    ($qb:ident) => {
        impl<'db> $qb<'db> {
            /// Add a raw SQL condition.
            pub fn where_raw(mut self, sql: &str) -> Self {
                self.core.where_raw(sql);
                self
            }

            /// `col = v`, `col IS NULL` or `col IN (..)` depending on the value.
            pub fn where_eq(
                mut self,
                column: impl Into<$crate::qb::ColumnRef>,
                value: impl Into<$crate::value::SqlValue>,
            ) -> Self {
                self.core
                    .where_cmp(column.into(), $crate::qb::CompareOp::Eq, value.into());
                self
            }

            /// Condition with an operator such as `>=`, `like` or `not in`.
            pub fn where_op(
                mut self,
                column: impl Into<$crate::qb::ColumnRef>,
                op: &str,
                value: impl Into<$crate::value::SqlValue>,
            ) -> Self {
                self.core.where_op(column.into(), op, value.into());
                self
            }

            /// One equality condition per pair.
            pub fn where_all<I, C, V>(mut self, pairs: I) -> Self
            where
                I: IntoIterator<Item = (C, V)>,
                C: Into<$crate::qb::ColumnRef>,
                V: Into<$crate::value::SqlValue>,
            {
                for (column, value) in pairs {
                    self.core
                        .where_cmp(column.into(), $crate::qb::CompareOp::Eq, value.into());
                }
                self
            }
        }
    };
}

/// ORDER BY and LIMIT methods shared by SELECT and UPDATE.
macro_rules! impl_order_limit_methods {
    ($qb:ident) => {
        impl<'db> $qb<'db> {
            /// Sort by a column; `"DESC"` (any case) sorts descending, anything else ascending.
            pub fn order(mut self, column: impl Into<$crate::qb::ColumnRef>, direction: &str) -> Self {
                self.core.order(column.into(), direction);
                self
            }

            /// Add a raw ORDER BY fragment.
            pub fn order_direct(mut self, sql: &str) -> Self {
                self.core.order_direct(sql);
                self
            }

            pub fn reset_order(mut self) -> Self {
                self.core.reset_order();
                self
            }

            pub fn limit(mut self, count: u64) -> Self {
                self.core.limit = Some($crate::qb::Limit { offset: 0, count });
                self
            }

            pub fn limit_offset(mut self, offset: u64, count: u64) -> Self {
                self.core.limit = Some($crate::qb::Limit { offset, count });
                self
            }

            /// `[count]` or `[offset, count]`; any other arity fails the build.
            pub fn limit_args(mut self, args: &[i64]) -> Self {
                self.core.limit_args(args);
                self
            }
        }
    };
}

/// Row and filter methods shared by INSERT and UPDATE.
macro_rules! impl_filter_methods {
    ($qb:ident) => {
        impl<'db> $qb<'db> {
            /// Encoding rule for one column; merged into any earlier rule for it.
            pub fn filter(mut self, column: &str, rule: impl Into<$crate::qb::FilterRule>) -> Self {
                self.core.filter(column, rule.into());
                self
            }

            pub fn filters<I, K, R>(mut self, rules: I) -> Self
            where
                I: IntoIterator<Item = (K, R)>,
                K: AsRef<str>,
                R: Into<$crate::qb::FilterRule>,
            {
                for (column, rule) in rules {
                    self.core.filter(column.as_ref(), rule.into());
                }
                self
            }

            /// Explicit column list; otherwise the first row's columns are written.
            pub fn columns<I, C>(mut self, columns: I) -> Self
            where
                I: IntoIterator<Item = C>,
                C: Into<$crate::qb::ColumnRef>,
            {
                for column in columns {
                    self.core.add_column(column.into());
                }
                self
            }
        }
    };
}

pub(crate) use impl_filter_methods;
pub(crate) use impl_order_limit_methods;
pub(crate) use impl_where_methods;
