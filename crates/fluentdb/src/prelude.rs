//! Convenient imports for typical `fluentdb` usage.
//!
//! ```ignore
//! use fluentdb::prelude::*;
//! ```

pub use crate::{
    Cache, ColumnFunction, ColumnRef, Cursor, Database, DbConfig, DbError, DbResult, Dialect,
    FetchOrientation, FetchStyle, FilterFunction, FilterRule, JoinType, MemoryCache, MutationQb,
    RawConnection, RowValues, SqlQb, SqlValue, StringFilter,
};
