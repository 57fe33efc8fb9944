//! Column references and their resolution against a builder's tables.

use crate::dialect::Dialect;

/// A column as given by the caller.
///
/// Converts from:
/// - `"col"`: the column of the most recently joined table
/// - `"T.col"`: the column of table (or alias) `T`
/// - `("T", "col")`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
    pub alias: Option<String>,
}

impl ColumnRef {
    pub fn new(column: &str) -> Self {
        Self {
            table: None,
            column: column.to_string(),
            alias: None,
        }
    }

    pub fn of(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            column: column.to_string(),
            alias: None,
        }
    }

    /// Select the column `AS alias`.
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        match s.split_once('.') {
            Some((table, column)) => Self::of(table, column),
            None => Self::new(s),
        }
    }
}

impl From<String> for ColumnRef {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for ColumnRef {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<(&str, &str)> for ColumnRef {
    fn from((table, column): (&str, &str)) -> Self {
        Self::of(table, column)
    }
}

/// A column resolved against a builder; `escaped` and `full` are rendered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub table: Option<String>,
    pub column: String,
    pub alias: Option<String>,
    /// `` `T`.`col` `` or `` `col` ``
    pub escaped: String,
    /// `escaped`, plus `` AS `alias` `` where column aliases are allowed
    pub full: String,
}

impl ResolvedColumn {
    pub(crate) fn resolve(
        col: &ColumnRef,
        last_table: Option<&str>,
        dialect: Dialect,
        allow_multi_table: bool,
        allow_column_alias: bool,
    ) -> Self {
        let table = col
            .table
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| last_table.map(str::to_string));

        let escaped = match &table {
            Some(t) if allow_multi_table => {
                format!("{}.{}", dialect.quote_ident(t), dialect.quote_ident(&col.column))
            }
            _ => dialect.quote_ident(&col.column),
        };

        let full = match &col.alias {
            Some(alias) if allow_column_alias && !alias.is_empty() => {
                format!("{escaped} AS {}", dialect.quote_ident(alias))
            }
            _ => escaped.clone(),
        };

        Self {
            table,
            column: col.column.clone(),
            alias: col.alias.clone(),
            escaped,
            full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(col: impl Into<ColumnRef>, multi: bool, alias: bool) -> ResolvedColumn {
        ResolvedColumn::resolve(&col.into(), Some("T"), Dialect::Generic, multi, alias)
    }

    #[test]
    fn shorthand_forms() {
        assert_eq!(resolve("x", true, true).escaped, "`T`.`x`");
        assert_eq!(resolve("U.x", true, true).escaped, "`U`.`x`");
        assert_eq!(resolve(("U", "x"), true, true).escaped, "`U`.`x`");
        assert_eq!(resolve("*", true, true).escaped, "`T`.*");
    }

    #[test]
    fn single_table_statements_drop_the_table() {
        let col = resolve("U.x", false, false);
        assert_eq!(col.escaped, "`x`");
        assert_eq!(col.table.as_deref(), Some("U"));
    }

    #[test]
    fn alias_only_where_allowed() {
        let col = ColumnRef::new("name").alias("n");
        assert_eq!(resolve(col.clone(), true, true).full, "`T`.`name` AS `n`");
        assert_eq!(resolve(col, true, false).full, "`T`.`name`");
    }

    #[test]
    fn no_table_known() {
        let col = ResolvedColumn::resolve(&"x".into(), None, Dialect::TSql, true, true);
        assert_eq!(col.escaped, "[x]");
    }
}
