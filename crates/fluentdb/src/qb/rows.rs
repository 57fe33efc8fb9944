//! Row encoding for INSERT and UPDATE.
//!
//! Each cell goes through the column's [`FilterRule`]: a string filter, then a column function
//! or the value preparer with the rule's defaults.

use std::collections::HashMap;
use std::str::FromStr;

use crate::config::UuidSource;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::prepare::{PrepareOptions, ValuePreparer};
use crate::qb::column::ResolvedColumn;
use crate::value::{ParamType, RowValues, SqlValue};

/// Transformation applied to a text value before it is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFilter {
    Trim,
    Upper,
    Lower,
    /// Keep the first `n` characters.
    Left(usize),
    /// Keep the last `n` characters.
    Right(usize),
    /// Wrap the rendered literal in a SQL function: `NAME(literal[,param])`.
    Sql { name: String, param: Option<String> },
}

impl StringFilter {
    /// Parse a filter name (case-insensitive). `LEFT` and `RIGHT` need a numeric parameter;
    /// unknown names become [`StringFilter::Sql`].
    pub fn parse(name: &str, param: Option<&str>) -> DbResult<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let length = || {
            param
                .and_then(|p| p.trim().parse::<usize>().ok())
                .ok_or_else(|| DbError::usage(format!("filter {upper} needs a numeric length")))
        };
        Ok(match upper.as_str() {
            "TRIM" => Self::Trim,
            "UPPER" | "UCASE" => Self::Upper,
            "LOWER" | "LCASE" => Self::Lower,
            "LEFT" => Self::Left(length()?),
            "RIGHT" => Self::Right(length()?),
            _ => Self::Sql {
                name: upper.clone(),
                param: param.map(str::to_string),
            },
        })
    }

    fn apply(&self, value: SqlValue) -> SqlValue {
        let SqlValue::Text(text) = value else {
            return value;
        };
        let filtered = match self {
            Self::Trim => text.trim().to_string(),
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Left(n) => text.chars().take(*n).collect(),
            Self::Right(n) => {
                let skip = text.chars().count().saturating_sub(*n);
                text.chars().skip(skip).collect()
            }
            Self::Sql { .. } => text,
        };
        SqlValue::Text(filtered)
    }
}

/// Value generated for a column instead of the supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFunction {
    Uuid,
    CurDate,
    CurrentDate,
    CurTime,
    CurrentTime,
    Now,
    CurrentTimestamp,
    UnixTimestamp,
    User,
    Database,
    /// `col + 1`
    Inc,
    /// `col - 1`
    Dec,
    /// The supplied epoch seconds as a `'YYYY-mm-dd HH:MM:SS'` UTC literal.
    UnixtimeAsDate,
}

impl FromStr for ColumnFunction {
    type Err = DbError;

    /// Case-insensitive; a trailing `()` is ignored.
    fn from_str(s: &str) -> DbResult<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_suffix("()").unwrap_or(&upper);
        Ok(match name {
            "UUID" => Self::Uuid,
            "CURDATE" => Self::CurDate,
            "CURRENT_DATE" => Self::CurrentDate,
            "CURTIME" => Self::CurTime,
            "CURRENT_TIME" => Self::CurrentTime,
            "NOW" => Self::Now,
            "CURRENT_TIMESTAMP" => Self::CurrentTimestamp,
            "UNIX_TIMESTAMP" => Self::UnixTimestamp,
            "USER" => Self::User,
            "DATABASE" => Self::Database,
            "INC" => Self::Inc,
            "DEC" => Self::Dec,
            "UNIXTIME_AS_DATE" => Self::UnixtimeAsDate,
            _ => return Err(DbError::usage(format!("unknown column function '{s}'"))),
        })
    }
}

impl ColumnFunction {
    /// The no-argument call for the date/time/session functions.
    fn call(self, dialect: Dialect) -> Option<&'static str> {
        let generic = match self {
            Self::CurDate => "CURDATE()",
            Self::CurrentDate => "CURRENT_DATE()",
            Self::CurTime => "CURTIME()",
            Self::CurrentTime => "CURRENT_TIME()",
            Self::Now => "NOW()",
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP()",
            Self::UnixTimestamp => "UNIX_TIMESTAMP()",
            Self::User => "USER()",
            Self::Database => "DATABASE()",
            _ => return None,
        };
        Some(match dialect {
            Dialect::Generic => generic,
            Dialect::TSql => match self {
                Self::Now | Self::CurrentTimestamp => "GETDATE()",
                Self::CurDate | Self::CurrentDate => "CAST(GETDATE() AS date)",
                Self::CurTime | Self::CurrentTime => "CAST(GETDATE() AS time)",
                Self::UnixTimestamp => "DATEDIFF(SECOND,'1970-01-01',GETUTCDATE())",
                Self::User => "CURRENT_USER",
                _ => "DB_NAME()",
            },
        })
    }
}

/// Per-column encoding rule. Unset fields keep their defaults (or the value of an earlier rule
/// when merged).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRule {
    /// Rendered for `NULL`; default `NULL`.
    pub if_null: Option<String>,
    /// Rendered for empty text; default `''`.
    pub if_empty: Option<String>,
    pub string_filter: Option<StringFilter>,
    pub function: Option<ColumnFunction>,
    /// Truncate text to this many characters.
    pub max_length: Option<usize>,
    pub param_type: Option<ParamType>,
}

impl FilterRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn if_null(mut self, sql: &str) -> Self {
        self.if_null = Some(sql.to_string());
        self
    }

    pub fn if_empty(mut self, sql: &str) -> Self {
        self.if_empty = Some(sql.to_string());
        self
    }

    pub fn string_filter(mut self, filter: StringFilter) -> Self {
        self.string_filter = Some(filter);
        self
    }

    pub fn function(mut self, function: ColumnFunction) -> Self {
        self.function = Some(function);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn param_type(mut self, param_type: ParamType) -> Self {
        self.param_type = Some(param_type);
        self
    }

    /// Overlay the fields set in `other`.
    pub fn merge(&mut self, other: FilterRule) {
        if other.if_null.is_some() {
            self.if_null = other.if_null;
        }
        if other.if_empty.is_some() {
            self.if_empty = other.if_empty;
        }
        if other.string_filter.is_some() {
            self.string_filter = other.string_filter;
        }
        if other.function.is_some() {
            self.function = other.function;
        }
        if other.max_length.is_some() {
            self.max_length = other.max_length;
        }
        if other.param_type.is_some() {
            self.param_type = other.param_type;
        }
    }

    fn prepare_options(&self) -> PrepareOptions {
        let defaults = PrepareOptions::default();
        PrepareOptions {
            if_null: self.if_null.clone().unwrap_or(defaults.if_null),
            if_empty: self.if_empty.clone().unwrap_or(defaults.if_empty),
            param_type: self.param_type.unwrap_or(defaults.param_type),
        }
    }
}

impl From<ColumnFunction> for FilterRule {
    fn from(function: ColumnFunction) -> Self {
        Self::new().function(function)
    }
}

impl From<StringFilter> for FilterRule {
    fn from(filter: StringFilter) -> Self {
        Self::new().string_filter(filter)
    }
}

/// Rendered rows: column list plus one tuple of SQL fragments per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRows {
    pub columns: Vec<String>,
    pub values: Vec<Vec<String>>,
}

pub(crate) struct RowEncoder<'a> {
    pub preparer: ValuePreparer<'a>,
    pub uuid_source: UuidSource,
    pub filters: &'a HashMap<String, FilterRule>,
}

impl RowEncoder<'_> {
    pub fn encode(&self, columns: &[ResolvedColumn], rows: &[RowValues]) -> DbResult<PreparedRows> {
        if columns.is_empty() {
            return Err(DbError::configuration("no columns to write"));
        }

        let values = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| self.encode_cell(col, lookup(row, col)))
                    .collect()
            })
            .collect();

        Ok(PreparedRows {
            columns: columns.iter().map(|c| c.full.clone()).collect(),
            values,
        })
    }

    fn encode_cell(&self, col: &ResolvedColumn, value: SqlValue) -> String {
        if let SqlValue::Func(f) = &value {
            return f.render(&self.preparer);
        }

        let default_rule = FilterRule::default();
        let rule = self.filters.get(&col.column).unwrap_or(&default_rule);
        let dialect = self.preparer.dialect();

        let value = match &rule.string_filter {
            Some(filter) => filter.apply(value),
            None => value,
        };

        let literal = match rule.function {
            Some(ColumnFunction::Uuid) => match self.uuid_source {
                UuidSource::Native => self.preparer.prepare(
                    &SqlValue::Text(uuid::Uuid::new_v4().to_string()),
                    &PrepareOptions::default(),
                ),
                UuidSource::Server => dialect.uuid_call().to_string(),
            },
            Some(ColumnFunction::Inc) => format!("{} + 1", dialect.quote_ident(&col.column)),
            Some(ColumnFunction::Dec) => format!("{} - 1", dialect.quote_ident(&col.column)),
            Some(ColumnFunction::UnixtimeAsDate) => unixtime_as_date(&value, dialect),
            Some(f) => f.call(dialect).unwrap_or_default().to_string(),
            None => {
                let value = match (rule.max_length, value) {
                    (Some(max), SqlValue::Text(s)) => SqlValue::Text(s.chars().take(max).collect()),
                    (_, v) => v,
                };
                self.preparer.prepare(&value, &rule.prepare_options())
            }
        };

        match &rule.string_filter {
            Some(StringFilter::Sql { name, param }) => match param.as_deref() {
                Some(p) if !p.is_empty() => format!("{name}({literal},{p})"),
                _ => format!("{name}({literal})"),
            },
            _ => literal,
        }
    }
}

fn lookup(row: &RowValues, col: &ResolvedColumn) -> SqlValue {
    row.get(&col.column)
        .or_else(|| {
            col.table
                .as_ref()
                .and_then(|t| row.get(&format!("{t}.{}", col.column)))
        })
        .cloned()
        .unwrap_or(SqlValue::Null)
}

fn unixtime_as_date(value: &SqlValue, dialect: Dialect) -> String {
    let seconds = match value {
        SqlValue::Int(i) if *i >= 0 => Some(*i),
        SqlValue::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    };
    let Some(date) = seconds.and_then(|s| chrono::DateTime::from_timestamp(s, 0)) else {
        return "NULL".to_string();
    };
    let literal = format!("'{}'", date.format("%Y-%m-%d %H:%M:%S"));
    match dialect {
        Dialect::Generic => literal,
        Dialect::TSql => format!("convert(datetime, {literal}, 120)"),
    }
}
