//! SQL dialects and their quoting rules.
//!
//! Two dialects are supported:
//!
//! - [`Dialect::Generic`]: MySQL-like, backtick identifiers, `LIMIT offset, count`
//! - [`Dialect::TSql`]: SQL Server-like, bracket identifiers, `TOP n` / `OFFSET .. FETCH`

use regex::Regex;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{DbError, DbResult};

/// SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL-like dialect.
    #[default]
    #[serde(alias = "mysql")]
    Generic,
    /// T-SQL (SQL Server) dialect.
    #[serde(alias = "sqlsrv", alias = "mssql")]
    TSql,
}

impl Dialect {
    /// Map a driver name (the DSN scheme, e.g. `mysql` or `sqlsrv`) to a dialect.
    pub fn from_driver(driver: &str) -> DbResult<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" | "generic" => Ok(Self::Generic),
            "sqlsrv" | "mssql" | "tsql" | "dblib" => Ok(Self::TSql),
            other => Err(DbError::configuration(format!(
                "Unknown database driver '{other}'"
            ))),
        }
    }

    /// Quote an identifier (table, column or alias).
    ///
    /// `*` is passed through. For T-SQL every `.` separates a bracketed part.
    pub fn quote_ident(self, ident: &str) -> String {
        if ident == "*" {
            return ident.to_string();
        }
        match self {
            Self::Generic => format!("`{ident}`"),
            Self::TSql => format!("[{}]", ident.replace('.', "].[")),
        }
    }

    /// Escape and quote a string literal without help from the driver.
    pub fn escape_literal(self, value: &str) -> String {
        match self {
            Self::Generic => format!("'{}'", escape_generic(value)),
            Self::TSql => format!("N'{}'", escape_tsql(value)),
        }
    }

    /// Spelling of `UUID()` for this dialect.
    pub fn uuid_call(self) -> &'static str {
        match self {
            Self::Generic => "UUID()",
            Self::TSql => "NEWID()",
        }
    }
}

impl FromStr for Dialect {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_driver(s)
    }
}

/// Backslash-escape `\`, NUL, `\n`, `\r`, `'`, `"` and 0x1A.
pub fn escape_generic(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

fn url_encoded_control() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("%0[0-8bcef]|%1[0-9a-f]").expect("invalid built-in control-sequence regex")
    })
}

/// Strip control characters (raw and URL-encoded) and double single quotes.
///
/// Tab, LF and CR survive.
pub fn escape_tsql(value: &str) -> String {
    let stripped = url_encoded_control().replace_all(value, "");
    let mut out = String::with_capacity(stripped.len() + 4);
    for ch in stripped.chars() {
        match ch {
            '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f' => {}
            '\'' => out.push_str("''"),
            c => out.push(c),
        }
    }
    out
}
