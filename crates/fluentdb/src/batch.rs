//! Batch scoping for derived cache keys.
//!
//! While a batch scope is active, reads without an explicit cache key are cached under
//! `scope|sha256(sql)`. Every read in the batch then shares the scope as a prefix, and a caller
//! that knows the scope can build the key of any of them.

use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

/// A batch scope shared by several [`Database`](crate::Database) handles.
///
/// Cloning shares the scope. A database's own scope (see
/// [`Database::start_batch`](crate::Database::start_batch)) takes precedence.
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    scope: Arc<Mutex<Option<String>>>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `scope` until the returned guard is dropped.
    pub fn start(&self, scope: impl Into<String>) -> BatchGuard<'_> {
        BatchGuard::start(&self.scope, scope.into())
    }

    /// The active scope, if any.
    pub fn current(&self) -> Option<String> {
        current(&self.scope)
    }
}

/// Keeps a batch scope active. Dropping it restores the scope that was active before.
#[must_use = "the batch scope ends when the guard is dropped"]
#[derive(Debug)]
pub struct BatchGuard<'a> {
    slot: &'a Mutex<Option<String>>,
    previous: Option<String>,
}

impl<'a> BatchGuard<'a> {
    pub(crate) fn start(slot: &'a Mutex<Option<String>>, scope: String) -> Self {
        let previous = match slot.lock() {
            Ok(mut current) => current.replace(scope),
            Err(poisoned) => poisoned.into_inner().replace(scope),
        };
        Self { slot, previous }
    }

    /// End the scope now.
    pub fn end(self) {}
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let previous = self.previous.take();
        match self.slot.lock() {
            Ok(mut current) => *current = previous,
            Err(poisoned) => *poisoned.into_inner() = previous,
        }
    }
}

pub(crate) fn current(slot: &Mutex<Option<String>>) -> Option<String> {
    match slot.lock() {
        Ok(current) => current.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Cache key for `sql` inside batch `scope`.
pub fn derive_key(scope: &str, sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{scope}|{:x}", hasher.finalize())
}
