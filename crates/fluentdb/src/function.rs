//! SQL functions that render themselves as raw SQL instead of escaped literals.
//!
//! Anything wrapped in a [`FilterFunction`] is trusted: it bypasses literal escaping wherever it
//! appears (row values, WHERE values, placeholders). Only the arguments that are plain values are
//! passed through the [`ValuePreparer`].

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::prepare::{PrepareOptions, ValuePreparer};
use crate::value::SqlValue;

/// A trusted SQL function call.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterFunction {
    /// `VALUES(col)`, the upsert reference to the row being inserted.
    Values(String),
    /// `UNIX_TIMESTAMP(expr)`
    UnixTimestamp(Option<Box<SqlValue>>),
    /// `TO_DAYS(expr)`, `TO_DAYS(NOW())` without an argument
    ToDays(Option<Box<SqlValue>>),
    /// `UNHEX('..')`, or `UNHEX(col)` when `column` is set
    Unhex { value: String, column: bool },
    /// `UTC_DATE()`
    UtcDate,
    /// `UTC_TIME()`
    UtcTime,
    /// `UTC_TIMESTAMP()`
    UtcTimestamp,
    /// `UUID()`
    Uuid,
}

impl FilterFunction {
    /// `VALUES(column)`. The column must not be empty.
    pub fn values(column: &str) -> DbResult<Self> {
        if column.trim().is_empty() {
            return Err(DbError::usage("VALUES(): parameter column required"));
        }
        Ok(Self::Values(column.to_string()))
    }

    pub fn unix_timestamp(expr: impl Into<SqlValue>) -> Self {
        Self::UnixTimestamp(Some(Box::new(expr.into())))
    }

    pub fn to_days(expr: impl Into<SqlValue>) -> Self {
        Self::ToDays(Some(Box::new(expr.into())))
    }

    pub fn unhex(hex: &str) -> Self {
        Self::Unhex {
            value: hex.to_string(),
            column: false,
        }
    }

    pub fn unhex_column(column: &str) -> Self {
        Self::Unhex {
            value: column.to_string(),
            column: true,
        }
    }

    /// Render as raw SQL.
    pub fn render(&self, preparer: &ValuePreparer<'_>) -> String {
        let bare = PrepareOptions::bare();
        let dialect = preparer.dialect();
        match self {
            Self::Values(col) => format!("VALUES({})", dialect.quote_ident(col)),
            Self::UnixTimestamp(expr) => {
                let arg = match expr {
                    Some(v) => preparer.prepare(v, &bare),
                    None => String::new(),
                };
                format!("UNIX_TIMESTAMP({arg})")
            }
            Self::ToDays(expr) => {
                let arg = match expr.as_deref() {
                    None | Some(SqlValue::Null) => "NOW()".to_string(),
                    Some(v) if v.is_empty_string() => "NOW()".to_string(),
                    Some(v) => preparer.prepare(v, &bare),
                };
                format!("TO_DAYS({arg})")
            }
            Self::Unhex { value, column: true } => format!("UNHEX({})", dialect.quote_ident(value)),
            Self::Unhex { value, column: false } => {
                format!("UNHEX({})", preparer.prepare(&SqlValue::from(value), &bare))
            }
            Self::UtcDate => utc_call(dialect, "UTC_DATE()", "CAST(GETUTCDATE() AS date)"),
            Self::UtcTime => utc_call(dialect, "UTC_TIME()", "CAST(GETUTCDATE() AS time)"),
            Self::UtcTimestamp => utc_call(dialect, "UTC_TIMESTAMP()", "GETUTCDATE()"),
            Self::Uuid => dialect.uuid_call().to_string(),
        }
    }
}

fn utc_call(dialect: Dialect, generic: &str, tsql: &str) -> String {
    match dialect {
        Dialect::Generic => generic.to_string(),
        Dialect::TSql => tsql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: &FilterFunction, dialect: Dialect) -> String {
        f.render(&ValuePreparer::manual(dialect))
    }

    #[test]
    fn fixed_calls() {
        assert_eq!(render(&FilterFunction::Uuid, Dialect::Generic), "UUID()");
        assert_eq!(render(&FilterFunction::UtcDate, Dialect::Generic), "UTC_DATE()");
        assert_eq!(render(&FilterFunction::UtcTime, Dialect::Generic), "UTC_TIME()");
        assert_eq!(render(&FilterFunction::UtcTimestamp, Dialect::Generic), "UTC_TIMESTAMP()");
        assert_eq!(render(&FilterFunction::Uuid, Dialect::TSql), "NEWID()");
        assert_eq!(render(&FilterFunction::UtcTimestamp, Dialect::TSql), "GETUTCDATE()");
    }

    #[test]
    fn values_requires_a_column() {
        assert!(FilterFunction::values("").unwrap_err().is_usage());
        let f = FilterFunction::values("hits").unwrap();
        assert_eq!(render(&f, Dialect::Generic), "VALUES(`hits`)");
    }

    #[test]
    fn argument_functions_prepare_their_arguments() {
        assert_eq!(
            render(&FilterFunction::unix_timestamp("2020-01-01"), Dialect::Generic),
            "UNIX_TIMESTAMP('2020-01-01')"
        );
        assert_eq!(
            render(&FilterFunction::UnixTimestamp(None), Dialect::Generic),
            "UNIX_TIMESTAMP()"
        );
        assert_eq!(render(&FilterFunction::ToDays(None), Dialect::Generic), "TO_DAYS(NOW())");
        assert_eq!(render(&FilterFunction::to_days(""), Dialect::Generic), "TO_DAYS(NOW())");
        assert_eq!(
            render(&FilterFunction::to_days("2024-02-29"), Dialect::Generic),
            "TO_DAYS('2024-02-29')"
        );
    }

    #[test]
    fn unhex_literal_or_column() {
        assert_eq!(render(&FilterFunction::unhex("4f4b"), Dialect::Generic), "UNHEX('4f4b')");
        assert_eq!(
            render(&FilterFunction::unhex_column("hash"), Dialect::Generic),
            "UNHEX(`hash`)"
        );
    }
}
