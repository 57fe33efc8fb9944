//! Connection-level configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};

/// Where `UUID` column functions get their value from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UuidSource {
    /// Generate a v4 UUID client-side and send it as a literal.
    #[default]
    Native,
    /// Let the server generate it (`UUID()` / `NEWID()`).
    Server,
}

/// Configuration for a [`Database`](crate::Database).
///
/// Every field has a default, so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQL dialect used for quoting and pagination.
    pub dialect: Dialect,
    /// Cacheable results must have fewer rows than this.
    pub cache_row_threshold: usize,
    /// TTL used by [`Database::query`](crate::Database::query) when a cache key is given
    /// without an explicit TTL.
    pub default_ttl_secs: u64,
    /// Try the driver's own quoting before falling back to manual escaping.
    pub native_quoting: bool,
    /// Source of `UUID` column-function values.
    pub uuid_source: UuidSource,
    /// Statements longer than this (in bytes) are truncated in logs. `None` disables truncation.
    pub log_sql_max_length: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            cache_row_threshold: 1100,
            default_ttl_secs: 120,
            native_quoting: true,
            uuid_source: UuidSource::Native,
            log_sql_max_length: Some(350),
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `FLUENTDB_DIALECT`, `FLUENTDB_CACHE_ROW_THRESHOLD` and
    /// `FLUENTDB_DEFAULT_TTL_SECS`.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = Self::default();
        if let Some(dialect) = lookup("FLUENTDB_DIALECT") {
            config.dialect = Dialect::from_driver(&dialect)?;
        }
        if let Some(threshold) = lookup("FLUENTDB_CACHE_ROW_THRESHOLD") {
            config.cache_row_threshold = parse_env("FLUENTDB_CACHE_ROW_THRESHOLD", &threshold)?;
        }
        if let Some(ttl) = lookup("FLUENTDB_DEFAULT_TTL_SECS") {
            config.default_ttl_secs = parse_env("FLUENTDB_DEFAULT_TTL_SECS", &ttl)?;
        }
        Ok(config)
    }

    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the exclusive row-count limit for caching a result.
    pub fn with_cache_row_threshold(mut self, threshold: usize) -> Self {
        self.cache_row_threshold = threshold;
        self
    }

    /// Set the default cache TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    /// Enable or disable native quoting.
    pub fn with_native_quoting(mut self, enabled: bool) -> Self {
        self.native_quoting = enabled;
        self
    }

    /// Choose where `UUID` column functions get their value from.
    pub fn with_uuid_source(mut self, source: UuidSource) -> Self {
        self.uuid_source = source;
        self
    }

    /// Set the maximum logged SQL length.
    pub fn with_log_sql_max_length(mut self, len: usize) -> Self {
        self.log_sql_max_length = Some(len);
        self
    }

    /// Log statements untruncated.
    pub fn no_log_truncate(mut self) -> Self {
        self.log_sql_max_length = None;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> DbResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| DbError::configuration(format!("{name}: invalid value '{raw}'")))
}

/// Configuration for [`MemoryCache`](crate::cache::MemoryCache).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries before the least recently used one is evicted.
    pub capacity: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl MemoryCacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = DbConfig::default();
        assert_eq!(config.dialect, Dialect::Generic);
        assert_eq!(config.cache_row_threshold, 1100);
        assert_eq!(config.default_ttl_secs, 120);
        assert!(config.native_quoting);
        assert_eq!(config.uuid_source, UuidSource::Native);
        assert_eq!(config.log_sql_max_length, Some(350));
        assert_eq!(MemoryCacheConfig::default().capacity, 1024);
    }

    #[test]
    fn env_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            ("FLUENTDB_DIALECT", "sqlsrv"),
            ("FLUENTDB_CACHE_ROW_THRESHOLD", "50"),
            ("FLUENTDB_DEFAULT_TTL_SECS", " 30 "),
        ]))
        .unwrap();
        assert_eq!(config.dialect, Dialect::TSql);
        assert_eq!(config.cache_row_threshold, 50);
        assert_eq!(config.default_ttl_secs, 30);
    }

    #[test]
    fn invalid_env_value_is_a_configuration_error() {
        let err = DbConfig::from_lookup(lookup(&[("FLUENTDB_DEFAULT_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("FLUENTDB_DEFAULT_TTL_SECS"));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: DbConfig =
            serde_json::from_str(r#"{"dialect": "tsql", "uuid_source": "server"}"#).unwrap();
        assert_eq!(config.dialect, Dialect::TSql);
        assert_eq!(config.uuid_source, UuidSource::Server);
        assert_eq!(config.cache_row_threshold, 1100);
    }

    #[test]
    fn builder_setters() {
        let config = DbConfig::new()
            .with_dialect(Dialect::TSql)
            .with_default_ttl(Duration::from_secs(5))
            .with_native_quoting(false)
            .no_log_truncate();
        assert_eq!(config.default_ttl_secs, 5);
        assert!(!config.native_quoting);
        assert_eq!(config.log_sql_max_length, None);
    }
}
