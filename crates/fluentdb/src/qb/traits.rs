//! Trait definitions for statement builders.

use crate::database::Database;
use crate::error::DbResult;

/// Base trait for all statement builders.
pub trait SqlQb {
    /// Render the statement, or report the first error recorded while chaining.
    ///
    /// Pure: building twice yields the same SQL.
    fn build_query(&self) -> DbResult<String>;

    /// The database the statement runs on.
    fn database(&self) -> &Database;

    /// Debug helper to get the SQL string; errors render as an SQL comment.
    fn to_sql(&self) -> String {
        self.build_query()
            .unwrap_or_else(|err| format!("/* {err} */"))
    }
}

/// Statements that change data.
pub trait MutationQb: SqlQb {
    /// Run the statement, then invalidate the given cache keys. Returns the affected row count.
    fn exec(&self, invalidate: &[&str]) -> DbResult<u64> {
        let sql = self.build_query()?;
        self.database().exec(&sql, invalidate)
    }
}
