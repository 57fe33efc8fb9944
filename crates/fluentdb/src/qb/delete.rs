//! DELETE statement builder.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::qb::core::{QbCore, impl_where_methods};
use crate::qb::table::{JoinType, TableRef};
use crate::qb::traits::{MutationQb, SqlQb};

/// DELETE statement builder with a single target table.
#[derive(Debug, Clone)]
pub struct DeleteQb<'db> {
    core: QbCore<'db>,
}

impl<'db> DeleteQb<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            core: QbCore::new(db, "DELETE", false, false),
        }
    }

    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        if self.core.tables.is_empty() {
            self.core
                .join(table.into(), None, None, None, JoinType::Inner);
        } else {
            self.core.record(DbError::usage("only one table allowed"));
        }
        self
    }
}

impl_where_methods!(DeleteQb);

impl SqlQb for DeleteQb<'_> {
    fn build_query(&self) -> DbResult<String> {
        self.core.check()?;
        let table = self.core.table_list("FROM")?;
        let where_sql = self.core.where_sql();
        if where_sql.is_empty() {
            Ok(format!("DELETE FROM {table}"))
        } else {
            Ok(format!("DELETE FROM {table} {where_sql}"))
        }
    }

    fn database(&self) -> &Database {
        self.core.db
    }
}

impl MutationQb for DeleteQb<'_> {}
