//! Conversion of typed values into dialect-safe SQL literals.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::connection::RawConnection;
use crate::dialect::Dialect;
use crate::value::{ParamType, SqlValue};

/// Per-call defaults for [`ValuePreparer::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Emitted verbatim for `NULL` values.
    pub if_null: String,
    /// Emitted verbatim for empty text.
    pub if_empty: String,
    /// Type hint forwarded to native quoting.
    pub param_type: ParamType,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            if_null: "NULL".to_string(),
            if_empty: "''".to_string(),
            param_type: ParamType::Str,
        }
    }
}

impl PrepareOptions {
    /// `NULL` and empty text both render as `''` (used by comparisons).
    pub fn comparison() -> Self {
        Self {
            if_null: "''".to_string(),
            ..Self::default()
        }
    }

    /// `NULL` and empty text both render as nothing (used for function arguments).
    pub fn bare() -> Self {
        Self {
            if_null: String::new(),
            if_empty: String::new(),
            param_type: ParamType::Str,
        }
    }
}

/// Converts [`SqlValue`]s into SQL literals for one connection.
///
/// Text is quoted by the driver while the connection's native-quoting latch is open. The first
/// time the driver refuses to quote, the latch closes for the rest of the connection's life and
/// the dialect's manual escaper takes over.
#[derive(Clone, Copy)]
pub struct ValuePreparer<'a> {
    dialect: Dialect,
    conn: Option<&'a dyn RawConnection>,
    native: Option<&'a AtomicBool>,
}

impl<'a> ValuePreparer<'a> {
    /// Preparer backed by a connection and its native-quoting latch.
    pub fn new(dialect: Dialect, conn: &'a dyn RawConnection, native: &'a AtomicBool) -> Self {
        Self {
            dialect,
            conn: Some(conn),
            native: Some(native),
        }
    }

    /// Preparer that only uses the dialect's manual escaper.
    pub fn manual(dialect: Dialect) -> Self {
        Self {
            dialect,
            conn: None,
            native: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render a value as a SQL literal.
    ///
    /// Lists render element-wise and are joined with `,`.
    pub fn prepare(&self, value: &SqlValue, opts: &PrepareOptions) -> String {
        match value {
            SqlValue::List(items) => self.prepare_each(items, opts).join(","),
            SqlValue::Func(f) => f.render(self),
            SqlValue::Null => opts.if_null.clone(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            v if v.is_integer_literal() => "0".to_string(),
            v if v.is_empty_string() => opts.if_empty.clone(),
            SqlValue::Text(s) => self.quote(s, opts.param_type),
            SqlValue::Float(f) => self.quote(&f.to_string(), opts.param_type),
        }
    }

    /// Render each element of a sequence, preserving order.
    pub fn prepare_each(&self, values: &[SqlValue], opts: &PrepareOptions) -> Vec<String> {
        values.iter().map(|v| self.prepare(v, opts)).collect()
    }

    /// Equality suffix for a WHERE fragment: ` = v`, ` IS NULL`, ` IN (..)` and their negations.
    pub fn equals(&self, value: &SqlValue, negate: bool) -> String {
        let opts = PrepareOptions::comparison();
        match value {
            SqlValue::Null if negate => " IS NOT NULL".to_string(),
            SqlValue::Null => " IS NULL".to_string(),
            SqlValue::List(items) => {
                let list = self.prepare_each(items, &opts).join(",");
                if negate {
                    format!(" NOT IN ({list})")
                } else {
                    format!(" IN ({list})")
                }
            }
            v => {
                let op = if negate { "<>" } else { "=" };
                format!(" {op} {}", self.prepare(v, &opts))
            }
        }
    }

    /// Shorthand for `equals(value, true)`.
    pub fn equals_not(&self, value: &SqlValue) -> String {
        self.equals(value, true)
    }

    fn quote(&self, text: &str, param_type: ParamType) -> String {
        if let (Some(conn), Some(native)) = (self.conn, self.native) {
            if native.load(Ordering::Acquire) {
                if let Some(quoted) = conn.quote(text, param_type) {
                    return quoted;
                }
                if native.swap(false, Ordering::AcqRel) {
                    tracing::warn!(
                        target: "fluentdb.sql",
                        dialect = ?self.dialect,
                        "native quoting failed; using manual escaping for this connection"
                    );
                }
            }
        }
        self.dialect.escape_literal(text)
    }
}

impl std::fmt::Debug for ValuePreparer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuePreparer")
            .field("dialect", &self.dialect)
            .field("native", &self.native.map(|n| n.load(Ordering::Relaxed)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Cursor;
    use crate::error::{DbError, DbResult};
    use crate::function::FilterFunction;
    use std::sync::atomic::AtomicUsize;

    /// Quotes with a `Q(..)` marker until `fail_after` calls, then refuses.
    struct QuotingConn {
        calls: AtomicUsize,
        fail_after: usize,
    }

    impl RawConnection for QuotingConn {
        fn execute(&self, _sql: &str) -> DbResult<u64> {
            Ok(0)
        }

        fn query(&self, _sql: &str) -> DbResult<Box<dyn Cursor>> {
            Err(DbError::unsupported("query"))
        }

        fn quote(&self, value: &str, _param_type: ParamType) -> Option<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (n < self.fail_after).then(|| format!("Q({value})"))
        }

        fn last_insert_id(&self) -> DbResult<String> {
            Ok(String::new())
        }
    }

    fn manual() -> ValuePreparer<'static> {
        ValuePreparer::manual(Dialect::Generic)
    }

    #[test]
    fn scalars() {
        let opts = PrepareOptions::default();
        let p = manual();
        assert_eq!(p.prepare(&SqlValue::Null, &opts), "NULL");
        assert_eq!(p.prepare(&SqlValue::Int(-3), &opts), "-3");
        assert_eq!(p.prepare(&SqlValue::from("0"), &opts), "0");
        assert_eq!(p.prepare(&SqlValue::from(""), &opts), "''");
        assert_eq!(p.prepare(&SqlValue::Bool(true), &opts), "1");
        assert_eq!(p.prepare(&SqlValue::from("a'b"), &opts), "'a\\'b'");
        assert_eq!(p.prepare(&SqlValue::Float(1.5), &opts), "'1.5'");
    }

    #[test]
    fn custom_null_and_empty_defaults_are_verbatim() {
        let opts = PrepareOptions {
            if_null: "DEFAULT".into(),
            if_empty: "NULL".into(),
            param_type: ParamType::Str,
        };
        let p = manual();
        assert_eq!(p.prepare(&SqlValue::Null, &opts), "DEFAULT");
        assert_eq!(p.prepare(&SqlValue::from(""), &opts), "NULL");
    }

    #[test]
    fn lists_and_functions() {
        let opts = PrepareOptions::default();
        let p = manual();
        let list = SqlValue::from(vec![SqlValue::Int(1), SqlValue::from("x"), SqlValue::Null]);
        assert_eq!(p.prepare(&list, &opts), "1,'x',NULL");
        assert_eq!(p.prepare(&SqlValue::Func(FilterFunction::Uuid), &opts), "UUID()");
    }

    #[test]
    fn equals_shapes() {
        let p = manual();
        assert_eq!(p.equals(&SqlValue::Null, false), " IS NULL");
        assert_eq!(p.equals_not(&SqlValue::Null), " IS NOT NULL");
        assert_eq!(p.equals(&SqlValue::Int(5), false), " = 5");
        assert_eq!(p.equals_not(&SqlValue::from("a")), " <> 'a'");
        assert_eq!(
            p.equals(&SqlValue::from(vec![SqlValue::Int(1), SqlValue::Null]), false),
            " IN (1,'')"
        );
        assert_eq!(p.equals_not(&SqlValue::from(vec![1, 2])), " NOT IN (1,2)");
    }

    #[test]
    fn tsql_manual_literals() {
        let p = ValuePreparer::manual(Dialect::TSql);
        assert_eq!(p.prepare(&SqlValue::from("O'Brien"), &PrepareOptions::default()), "N'O''Brien'");
    }

    #[test]
    fn native_quoting_is_used_while_it_works() {
        let conn = QuotingConn {
            calls: AtomicUsize::new(0),
            fail_after: usize::MAX,
        };
        let latch = AtomicBool::new(true);
        let p = ValuePreparer::new(Dialect::Generic, &conn, &latch);
        assert_eq!(p.prepare(&SqlValue::from("x"), &PrepareOptions::default()), "Q(x)");
        assert!(latch.load(Ordering::SeqCst));
    }

    #[test]
    fn native_quote_failure_latches_permanently() {
        let conn = QuotingConn {
            calls: AtomicUsize::new(0),
            fail_after: 1,
        };
        let latch = AtomicBool::new(true);
        let p = ValuePreparer::new(Dialect::Generic, &conn, &latch);
        let opts = PrepareOptions::default();

        assert_eq!(p.prepare(&SqlValue::from("a"), &opts), "Q(a)");
        assert_eq!(p.prepare(&SqlValue::from("b"), &opts), "'b'");
        assert!(!latch.load(Ordering::SeqCst));

        // The driver is never asked again, even though it would now be able to answer.
        assert_eq!(p.prepare(&SqlValue::from("c"), &opts), "'c'");
        assert_eq!(conn.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn closed_latch_skips_the_driver() {
        let conn = QuotingConn {
            calls: AtomicUsize::new(0),
            fail_after: usize::MAX,
        };
        let latch = AtomicBool::new(false);
        let p = ValuePreparer::new(Dialect::TSql, &conn, &latch);
        assert_eq!(p.prepare(&SqlValue::from("x"), &PrepareOptions::default()), "N'x'");
        assert_eq!(conn.calls.load(Ordering::SeqCst), 0);
    }
}
