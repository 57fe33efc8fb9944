//! Tables, aliases and joins.

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};

/// A table, optionally qualified with its database.
///
/// Converts from `"table"`, `"db.table"` and `("db", "table")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            database: None,
            table: table.to_string(),
        }
    }

    pub fn qualified(database: &str, table: &str) -> Self {
        Self {
            database: Some(database.to_string()),
            table: table.to_string(),
        }
    }
}

impl From<&str> for TableRef {
    fn from(s: &str) -> Self {
        match s.split_once('.') {
            Some((db, table)) => Self::qualified(db, table),
            None => Self::new(s),
        }
    }
}

impl From<String> for TableRef {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<(&str, &str)> for TableRef {
    fn from((db, table): (&str, &str)) -> Self {
        Self::qualified(db, table)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Inner,
    LeftOuter,
}

impl JoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::LeftOuter => "LEFT OUTER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JoinClause {
    pub id_column: String,
    /// Rendered right-hand side of the ON predicate.
    pub join_to: String,
    pub join_type: JoinType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableEntry {
    pub alias: String,
    pub table: TableRef,
    pub join: Option<JoinClause>,
}

impl TableEntry {
    fn quoted(&self, dialect: Dialect) -> String {
        let table = dialect.quote_ident(&self.table.table);
        match self.table.database.as_deref().filter(|d| !d.is_empty()) {
            Some(db) => format!("{}.{table}", dialect.quote_ident(db)),
            None => table,
        }
    }
}

/// Alias for `table` given the aliases already taken.
///
/// An explicit alias must be unused. Otherwise the upper-case initials of the `_`-separated
/// name are used (`user_log` → `UL`), then the initials plus `2`, then the first free `tbl<n>`.
pub(crate) fn derive_alias(
    explicit: Option<&str>,
    table: &str,
    taken: &[TableEntry],
) -> DbResult<String> {
    let is_taken = |alias: &str| taken.iter().any(|t| t.alias == alias);

    if let Some(alias) = explicit.filter(|a| !a.is_empty()) {
        if is_taken(alias) {
            return Err(DbError::usage(format!("table alias '{alias}' already used")));
        }
        return Ok(alias.to_string());
    }

    let mut alias: String = table
        .to_uppercase()
        .split('_')
        .filter_map(|part| part.chars().next())
        .collect();
    if is_taken(&alias) {
        alias.push('2');
    }
    let mut n = taken.len();
    while is_taken(&alias) {
        alias = format!("tbl{n}");
        n += 1;
    }
    Ok(alias)
}

/// Render the table list of a statement.
///
/// Multi-table statements list every non-joined table as `` `t` A `` (comma-separated) followed
/// by the JOIN clauses. Single-table statements render the first non-joined table alone.
pub(crate) fn build_table_list(
    tables: &[TableEntry],
    dialect: Dialect,
    allow_multi_table: bool,
    required: &str,
) -> DbResult<String> {
    let mut froms = Vec::new();
    let mut joins = Vec::new();

    for entry in tables {
        let quoted = entry.quoted(dialect);
        match &entry.join {
            None if allow_multi_table => froms.push(format!("{quoted} {}", entry.alias)),
            None => return Ok(quoted),
            Some(join) => joins.push(format!(
                "{} JOIN {quoted} {} ON {}.{} = {}",
                join.join_type.keyword(),
                entry.alias,
                dialect.quote_ident(&entry.alias),
                dialect.quote_ident(&join.id_column),
                join.join_to
            )),
        }
    }

    if froms.is_empty() {
        return Err(DbError::configuration(format!("Need to specify \"{required}\"!")));
    }

    let mut out = froms.join(",");
    if !joins.is_empty() {
        out.push(' ');
        out.push_str(&joins.join(" "));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(alias: &str, table: &str) -> TableEntry {
        TableEntry {
            alias: alias.to_string(),
            table: TableRef::from(table),
            join: None,
        }
    }

    #[test]
    fn table_ref_forms() {
        assert_eq!(TableRef::from("users"), TableRef::new("users"));
        assert_eq!(TableRef::from("app.users"), TableRef::qualified("app", "users"));
        assert_eq!(TableRef::from(("app", "users")), TableRef::qualified("app", "users"));
    }

    #[test]
    fn alias_from_initials_then_suffix_then_counter() {
        let mut taken = Vec::new();
        let a = derive_alias(None, "user_log", &taken).unwrap();
        assert_eq!(a, "UL");
        taken.push(entry(&a, "user_log"));

        let b = derive_alias(None, "user_log", &taken).unwrap();
        assert_eq!(b, "UL2");
        taken.push(entry(&b, "user_log"));

        let c = derive_alias(None, "user_log", &taken).unwrap();
        assert_eq!(c, "tbl2");
    }

    #[test]
    fn counter_alias_skips_explicit_ones() {
        let taken = vec![entry("UL", "user_log"), entry("UL2", "user_log"), entry("tbl3", "t")];
        assert_eq!(derive_alias(None, "user_log", &taken).unwrap(), "tbl4");
    }

    #[test]
    fn explicit_alias_must_be_unique() {
        let taken = vec![entry("T", "t")];
        assert!(derive_alias(Some("T"), "x", &taken).unwrap_err().is_usage());
        assert_eq!(derive_alias(Some("X"), "x", &taken).unwrap(), "X");
    }

    #[test]
    fn table_list_with_join() {
        let tables = vec![
            entry("A", "app.accounts"),
            TableEntry {
                alias: "J".to_string(),
                table: TableRef::new("jobs"),
                join: Some(JoinClause {
                    id_column: "id".to_string(),
                    join_to: "`A`.`id`".to_string(),
                    join_type: JoinType::Inner,
                }),
            },
        ];
        assert_eq!(
            build_table_list(&tables, Dialect::Generic, true, "FROM").unwrap(),
            "`app`.`accounts` A INNER JOIN `jobs` J ON `J`.`id` = `A`.`id`"
        );
        assert_eq!(
            build_table_list(&tables, Dialect::Generic, false, "FROM").unwrap(),
            "`app`.`accounts`"
        );
    }

    #[test]
    fn empty_table_list_names_the_clause() {
        let err = build_table_list(&[], Dialect::Generic, true, "TABLE").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: Need to specify \"TABLE\"!");
    }
}
