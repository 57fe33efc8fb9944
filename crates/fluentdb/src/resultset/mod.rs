//! Query results: a lazily executed, cache-aware resultset and the in-memory cursor it falls
//! back to.

mod cached;
mod live;

pub use cached::CachedResultset;
pub use live::{LiveResultset, Resolution};
