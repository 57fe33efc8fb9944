//! The connection context every builder and resultset runs through.

use serde_json::Value;
use std::borrow::Cow;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::batch::{self, BatchContext, BatchGuard};
use crate::cache::Cache;
use crate::config::DbConfig;
use crate::connection::{Cursor, RawConnection};
use crate::dialect::Dialect;
use crate::error::DbResult;
use crate::placeholder::{self, Placeholders};
use crate::prepare::{PrepareOptions, ValuePreparer};
use crate::qb::{DeleteQb, InsertQb, SelectQb, UpdateQb};
use crate::resultset::LiveResultset;
use crate::script;
use crate::value::{ParamType, SqlValue};

/// Result of one statement of [`Database::exec_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub sql: String,
    pub affected: u64,
}

/// A handle on one database connection.
///
/// Holds the connection, its native-quoting latch, the configuration, the optional result cache
/// and the batch scope used to derive cache keys.
///
/// # Example
/// ```ignore
/// let db = Database::new(conn, DbConfig::default()).with_cache(Arc::new(MemoryCache::default()));
///
/// let mut users = db
///     .select()
///     .from("users")
///     .where_eq("active", 1)
///     .order("name", "ASC")
///     .query_cached("users:active", Duration::from_secs(60))?;
///
/// while let Some(row) = users.fetch(FetchStyle::Map, FetchOrientation::Next)? {
///     println!("{row:?}");
/// }
///
/// db.update().table("users").values(RowValues::new().set("active", 0)).where_eq("id", 7)
///     .exec(&["users:active"])?;
/// ```
pub struct Database {
    name: String,
    conn: Arc<dyn RawConnection>,
    native_quote: Arc<AtomicBool>,
    config: DbConfig,
    cache: Option<Arc<dyn Cache>>,
    batch: Mutex<Option<String>>,
    shared_batch: Option<BatchContext>,
}

impl Database {
    pub fn new(conn: impl RawConnection + 'static, config: DbConfig) -> Self {
        Self::from_arc(Arc::new(conn), config)
    }

    pub fn from_arc(conn: Arc<dyn RawConnection>, config: DbConfig) -> Self {
        let native_quote = Arc::new(AtomicBool::new(config.native_quoting));
        Self::from_parts("main", conn, native_quote, config)
    }

    pub(crate) fn from_parts(
        name: &str,
        conn: Arc<dyn RawConnection>,
        native_quote: Arc<AtomicBool>,
        config: DbConfig,
    ) -> Self {
        Self {
            name: name.to_string(),
            conn,
            native_quote,
            config,
            cache: None,
            batch: Mutex::new(None),
            shared_batch: None,
        }
    }

    /// Attach a result cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share a batch scope with other handles.
    pub fn with_batch_context(mut self, ctx: BatchContext) -> Self {
        self.shared_batch = Some(ctx);
        self
    }

    /// Name used in log events.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&dyn Cache> {
        self.cache.as_deref()
    }

    pub fn connection(&self) -> &dyn RawConnection {
        self.conn.as_ref()
    }

    // ==================== Value preparation ====================

    /// Preparer bound to this connection's quoting latch.
    pub fn preparer(&self) -> ValuePreparer<'_> {
        ValuePreparer::new(self.dialect(), self.conn.as_ref(), &self.native_quote)
    }

    /// Render a value as a SQL literal with the default options.
    pub fn prepare(&self, value: impl Into<SqlValue>) -> String {
        self.preparer().prepare(&value.into(), &PrepareOptions::default())
    }

    pub fn prepare_with(&self, value: impl Into<SqlValue>, opts: &PrepareOptions) -> String {
        self.preparer().prepare(&value.into(), opts)
    }

    /// ` = v`, ` IS NULL` or ` IN (..)`.
    pub fn equals(&self, value: impl Into<SqlValue>) -> String {
        self.preparer().equals(&value.into(), false)
    }

    /// ` <> v`, ` IS NOT NULL` or ` NOT IN (..)`.
    pub fn equals_not(&self, value: impl Into<SqlValue>) -> String {
        self.preparer().equals(&value.into(), true)
    }

    /// Quote through the driver, bypassing the latch and the manual escapers.
    pub fn quote(&self, value: &str, param_type: ParamType) -> Option<String> {
        self.conn.quote(value, param_type)
    }

    // ==================== Statement builders ====================

    pub fn select(&self) -> SelectQb<'_> {
        SelectQb::new(self)
    }

    /// `select()` with an explicit column list.
    pub fn select_columns<I, C>(&self, columns: I) -> SelectQb<'_>
    where
        I: IntoIterator<Item = C>,
        C: Into<crate::qb::ColumnRef>,
    {
        SelectQb::new(self).columns(columns)
    }

    pub fn insert(&self) -> InsertQb<'_> {
        InsertQb::new(self, &[])
    }

    /// `insert()` with flags such as `IGNORE`, `DELAYED` or `REPLACE`.
    pub fn insert_with_flags(&self, flags: &[&str]) -> InsertQb<'_> {
        InsertQb::new(self, flags)
    }

    pub fn replace(&self) -> InsertQb<'_> {
        InsertQb::new(self, &["REPLACE"])
    }

    pub fn update(&self) -> UpdateQb<'_> {
        UpdateQb::new(self)
    }

    pub fn delete(&self) -> DeleteQb<'_> {
        DeleteQb::new(self)
    }

    // ==================== Writes ====================

    /// Run a statement, then invalidate the given cache keys.
    pub fn exec(&self, sql: &str, invalidate: &[&str]) -> DbResult<u64> {
        let started = Instant::now();
        let result = self.conn.execute(sql);
        let elapsed_ms = elapsed_ms(started);
        let affected = match result {
            Ok(affected) => {
                tracing::debug!(
                    target: "fluentdb.sql",
                    db = %self.name,
                    sql = %self.log_sql(sql),
                    rows = affected,
                    elapsed_ms,
                    "exec"
                );
                affected
            }
            Err(err) => {
                tracing::debug!(
                    target: "fluentdb.sql",
                    db = %self.name,
                    sql = %self.log_sql(sql),
                    elapsed_ms,
                    error = %err,
                    "exec failed"
                );
                return Err(err);
            }
        };
        self.invalidate(invalidate);
        Ok(affected)
    }

    /// [`exec`](Self::exec) after substituting `{{..}}` placeholders.
    pub fn exec_with(
        &self,
        sql: &str,
        placeholders: &Placeholders,
        invalidate: &[&str],
    ) -> DbResult<u64> {
        let sql = placeholder::substitute(sql, placeholders, &self.preparer())?;
        self.exec(&sql, invalidate)
    }

    /// Run a multi-statement script, stopping at the first failure.
    ///
    /// The cache keys are invalidated after the first statement only.
    pub fn exec_batch(&self, script: &str, invalidate: &[&str]) -> DbResult<Vec<BatchOutcome>> {
        let mut outcomes = Vec::new();
        let mut handles = invalidate;
        for sql in script::split_statements(script) {
            let affected = self.exec(&sql, handles)?;
            handles = &[];
            outcomes.push(BatchOutcome { sql, affected });
        }
        Ok(outcomes)
    }

    /// Delete cache entries. Failures are logged and otherwise ignored.
    pub fn invalidate(&self, keys: &[&str]) {
        let Some(cache) = self.cache() else {
            return;
        };
        for key in keys {
            if let Err(err) = cache.delete(key) {
                tracing::warn!(target: "fluentdb.cache", key = %key, error = %err, "cache delete failed");
            } else {
                tracing::trace!(target: "fluentdb.cache", key = %key, "invalidated");
            }
        }
    }

    // ==================== Reads ====================

    /// Lazily run a query.
    ///
    /// Inside a batch scope the result is cached under a key derived from the scope and the SQL.
    pub fn query(&self, sql: impl Into<String>) -> LiveResultset<'_> {
        self.query_keyed(sql.into(), None, self.default_ttl())
    }

    /// Lazily run a query whose result is cached under `key` for `ttl`.
    pub fn query_cached(
        &self,
        sql: impl Into<String>,
        key: impl Into<String>,
        ttl: Duration,
    ) -> LiveResultset<'_> {
        self.query_keyed(sql.into(), Some(key.into()), ttl)
    }

    /// [`query`](Self::query) after substituting `{{..}}` placeholders.
    pub fn query_with(
        &self,
        sql: &str,
        placeholders: &Placeholders,
    ) -> DbResult<LiveResultset<'_>> {
        let sql = placeholder::substitute(sql, placeholders, &self.preparer())?;
        Ok(self.query(sql))
    }

    /// General form of the query entry points. Without a key, the batch scope decides.
    pub fn query_keyed(
        &self,
        sql: String,
        key: Option<String>,
        ttl: Duration,
    ) -> LiveResultset<'_> {
        let key = key.or_else(|| {
            self.current_batch()
                .map(|scope| batch::derive_key(&scope, &sql))
        });
        LiveResultset::new(self, sql, key, ttl)
    }

    /// Run a query right away on the driver, bypassing the cache.
    pub fn query_live(&self, sql: &str) -> DbResult<Box<dyn Cursor>> {
        let started = Instant::now();
        let result = self.conn.query(sql);
        let elapsed_ms = elapsed_ms(started);
        match &result {
            Ok(_) => tracing::debug!(
                target: "fluentdb.sql",
                db = %self.name,
                sql = %self.log_sql(sql),
                elapsed_ms,
                "query"
            ),
            Err(err) => tracing::debug!(
                target: "fluentdb.sql",
                db = %self.name,
                sql = %self.log_sql(sql),
                elapsed_ms,
                error = %err,
                "query failed"
            ),
        }
        result
    }

    pub(crate) fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.default_ttl_secs)
    }

    // ==================== Batch scope ====================

    /// Activate a batch scope on this handle until the guard is dropped.
    pub fn start_batch(&self, scope: impl Into<String>) -> BatchGuard<'_> {
        BatchGuard::start(&self.batch, scope.into())
    }

    /// The scope used to derive cache keys: this handle's, then the shared one.
    pub fn current_batch(&self) -> Option<String> {
        batch::current(&self.batch)
            .or_else(|| self.shared_batch.as_ref().and_then(BatchContext::current))
    }

    // ==================== Connection pass-through ====================

    pub fn begin_transaction(&self) -> DbResult<()> {
        self.conn.begin_transaction()
    }

    pub fn commit(&self) -> DbResult<()> {
        self.conn.commit()
    }

    pub fn roll_back(&self) -> DbResult<()> {
        self.conn.roll_back()
    }

    pub fn last_insert_id(&self) -> DbResult<String> {
        self.conn.last_insert_id()
    }

    pub fn get_attribute(&self, name: &str) -> DbResult<Value> {
        self.conn.get_attribute(name)
    }

    pub fn set_attribute(&self, name: &str, value: Value) -> DbResult<()> {
        self.conn.set_attribute(name, value)
    }

    fn log_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.config.log_sql_max_length {
            Some(max) => truncate_sql(sql, max),
            None => Cow::Borrowed(sql),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .field("batch", &self.current_batch())
            .finish()
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Shorten SQL for logging.
///
/// Statements longer than `max` bytes keep their first `max - 100` bytes (cut on a char
/// boundary) followed by `[...]`.
pub fn truncate_sql(sql: &str, max: usize) -> Cow<'_, str> {
    if sql.len() <= max {
        return Cow::Borrowed(sql);
    }
    let mut end = max.saturating_sub(100);
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}[...]", &sql[..end]))
}
