//! Dialect-aware statement builders.
//!
//! Builders accumulate tables, columns, conditions, ordering, pagination and rows, and render
//! them through [`SqlQb::build_query`]. Every builder borrows the [`Database`](crate::Database)
//! it was created from, which supplies the dialect and value quoting.
//!
//! # Usage
//!
//! ```ignore
//! use fluentdb::prelude::*;
//!
//! // SELECT  * FROM `t` T WHERE `T`.`x` > 5 ORDER BY `T`.`y` DESC LIMIT 10, 20
//! let sql = db
//!     .select()
//!     .from("t")
//!     .where_op("x", ">", 5)
//!     .order("y", "desc")
//!     .limit_offset(10, 20)
//!     .build_query()?;
//!
//! // INSERT  INTO `users` (`id`,`name`) VALUES (UUID(),'a\'b')
//! db.insert()
//!     .into("users")
//!     .row(RowValues::new().set("id", FilterFunction::Uuid).set("name", "a'b"))
//!     .exec(&["users:all"])?;
//!
//! db.update()
//!     .table("users")
//!     .values(RowValues::new().set("visits", 0))
//!     .filter("visits", ColumnFunction::Inc)
//!     .where_eq("id", 7)
//!     .exec(&[])?;
//!
//! db.delete().from("users").where_eq("id", 7).exec(&["users:all"])?;
//! ```

mod column;
mod core;
mod delete;
mod filter;
mod insert;
mod rows;
mod select;
mod table;
mod traits;
mod update;

pub use column::{ColumnRef, ResolvedColumn};
pub use delete::DeleteQb;
pub use filter::{CompareOp, Limit};
pub use insert::InsertQb;
pub use rows::{ColumnFunction, FilterRule, PreparedRows, StringFilter};
pub use select::SelectQb;
pub use table::{JoinType, TableRef};
pub use traits::{MutationQb, SqlQb};
pub use update::UpdateQb;
