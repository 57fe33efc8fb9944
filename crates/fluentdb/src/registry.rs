//! Named connections, opened on first use.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::batch::BatchContext;
use crate::cache::Cache;
use crate::config::DbConfig;
use crate::connection::RawConnection;
use crate::database::Database;
use crate::error::{DbError, DbResult};

type Connector = Box<dyn Fn() -> DbResult<Arc<dyn RawConnection>> + Send + Sync>;

struct RegistryEntry {
    connector: Connector,
    config: DbConfig,
    live: Option<LiveConnection>,
}

#[derive(Clone)]
struct LiveConnection {
    conn: Arc<dyn RawConnection>,
    native_quote: Arc<AtomicBool>,
}

/// Registry of logical connection names.
///
/// Each name maps to a connector. The first [`database`](Self::database) call for a name opens
/// the connection; later calls share it, along with its native-quoting latch. Every handed-out
/// [`Database`] gets the registry's cache and batch context.
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
    cache: Option<Arc<dyn Cache>>,
    batch: BatchContext,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cache: None,
            batch: BatchContext::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Batch scope shared by every database handed out by this registry.
    pub fn batch_context(&self) -> &BatchContext {
        &self.batch
    }

    /// Register (or replace) a connection name. Replacing drops the previous live connection.
    pub fn register<F>(&self, name: &str, config: DbConfig, connector: F)
    where
        F: Fn() -> DbResult<Arc<dyn RawConnection>> + Send + Sync + 'static,
    {
        self.lock().insert(
            name.to_string(),
            RegistryEntry {
                connector: Box::new(connector),
                config,
                live: None,
            },
        );
    }

    /// A handle on the named connection, connecting first if needed.
    pub fn database(&self, name: &str) -> DbResult<Database> {
        let mut entries = self.lock();
        let entry = entries.get_mut(name).ok_or_else(|| {
            DbError::configuration(format!("Database configuration missing for '{name}'"))
        })?;

        let live = match &entry.live {
            Some(live) => live.clone(),
            None => {
                let started = Instant::now();
                let conn = (entry.connector)().map_err(|e| e.context(name))?;
                tracing::debug!(
                    target: "fluentdb.sql",
                    db = %name,
                    elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "connected"
                );
                let live = LiveConnection {
                    conn,
                    native_quote: Arc::new(AtomicBool::new(entry.config.native_quoting)),
                };
                entry.live = Some(live.clone());
                live
            }
        };

        let mut db = Database::from_parts(name, live.conn, live.native_quote, entry.config.clone())
            .with_batch_context(self.batch.clone());
        if let Some(cache) = &self.cache {
            db = db.with_cache(Arc::clone(cache));
        }
        Ok(db)
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.lock()
            .get(name)
            .is_some_and(|entry| entry.live.is_some())
    }

    /// Drop the live connection for `name`; the next [`database`](Self::database) call reconnects.
    /// Handles already handed out keep the old connection.
    pub fn disconnect(&self, name: &str) -> bool {
        self.lock()
            .get_mut(name)
            .and_then(|entry| entry.live.take())
            .is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Cursor;
    use crate::value::ParamType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Null;

    impl RawConnection for Null {
        fn execute(&self, _sql: &str) -> DbResult<u64> {
            Ok(0)
        }

        fn query(&self, _sql: &str) -> DbResult<Box<dyn Cursor>> {
            Err(DbError::unsupported("query"))
        }

        fn quote(&self, _value: &str, _param_type: ParamType) -> Option<String> {
            None
        }

        fn last_insert_id(&self) -> DbResult<String> {
            Ok(String::new())
        }
    }

    fn counting_registry() -> (ConnectionRegistry, Arc<AtomicUsize>) {
        let connects = Arc::new(AtomicUsize::new(0));
        let registry = ConnectionRegistry::new();
        let counter = connects.clone();
        registry.register("main", DbConfig::default(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Null) as Arc<dyn RawConnection>)
        });
        (registry, connects)
    }

    #[test]
    fn connects_lazily_and_once() {
        let (registry, connects) = counting_registry();
        assert!(!registry.is_connected("main"));
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        let a = registry.database("main").unwrap();
        let b = registry.database("main").unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(registry.is_connected("main"));
        assert_eq!(a.name(), "main");
        assert_eq!(b.name(), "main");
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let registry = ConnectionRegistry::new();
        let err = registry.database("reporting").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn connector_errors_carry_the_name() {
        let registry = ConnectionRegistry::new();
        registry.register("broken", DbConfig::default(), || {
            Err(DbError::configuration("no host"))
        });
        let err = registry.database("broken").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: broken: no host");
        assert!(!registry.is_connected("broken"));
    }

    #[test]
    fn disconnect_forces_reconnect() {
        let (registry, connects) = counting_registry();
        registry.database("main").unwrap();
        assert!(registry.disconnect("main"));
        assert!(!registry.disconnect("main"));
        registry.database("main").unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handles_share_the_batch_context() {
        let (registry, _) = counting_registry();
        let db = registry.database("main").unwrap();
        let _guard = registry.batch_context().start("request");
        assert_eq!(db.current_batch().as_deref(), Some("request"));
    }
}
