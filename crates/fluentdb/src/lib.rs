//! # fluentdb
//!
//! Fluent, dialect-aware SQL construction with opportunistic result caching.
//!
//! ## Features
//!
//! - **Two dialects**: a MySQL-style generic dialect and T-SQL (quoting, pagination, functions)
//! - **Fluent builders**: SELECT / INSERT / UPDATE / DELETE with alias derivation and joins
//! - **Row encoding**: per-column filters and functions (`UUID`, `INC`, `UNIXTIME_AS_DATE`, ...)
//! - **Result caching**: small keyed results are materialized and served from a [`Cache`]
//! - **Batch scopes**: queries inside a scope are cached under derived keys
//! - **Driver agnostic**: plug any driver in through [`RawConnection`]
//!
//! ## Example
//!
//! ```ignore
//! use fluentdb::prelude::*;
//!
//! let db = Database::new(conn, DbConfig::from_env()?)
//!     .with_cache(Arc::new(MemoryCache::default()));
//!
//! let mut rs = db
//!     .select()
//!     .from("users")
//!     .where_eq("active", 1)
//!     .query_cached("users:active", Duration::from_secs(60))?;
//! let rows = rs.fetch_rows()?;
//!
//! db.update()
//!     .table("users")
//!     .values(RowValues::new().set("active", 0))
//!     .where_eq("id", 7)
//!     .exec(&["users:active"])?;
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod connection;
pub mod database;
pub mod dialect;
pub mod error;
pub mod function;
pub mod placeholder;
pub mod prelude;
pub mod prepare;
pub mod qb;
pub mod registry;
pub mod resultset;
pub mod script;
pub mod value;

pub use batch::{BatchContext, BatchGuard};
pub use cache::{Cache, CacheError, MemoryCache};
pub use config::{DbConfig, MemoryCacheConfig, UuidSource};
pub use connection::{
    ColumnKey, Cursor, FetchOrientation, FetchStyle, FetchedRow, RawConnection, Row,
};
pub use database::{BatchOutcome, Database};
pub use dialect::Dialect;
pub use error::{DbError, DbResult};
pub use function::FilterFunction;
pub use placeholder::Placeholders;
pub use prepare::{PrepareOptions, ValuePreparer};
pub use qb::{
    ColumnFunction, ColumnRef, CompareOp, DeleteQb, FilterRule, InsertQb, JoinType, MutationQb,
    SelectQb, SqlQb, StringFilter, TableRef, UpdateQb,
};
pub use registry::ConnectionRegistry;
pub use resultset::{CachedResultset, LiveResultset, Resolution};
pub use value::{ParamType, RowValues, SqlValue};
