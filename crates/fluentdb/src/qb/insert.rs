//! INSERT / REPLACE statement builder.

use crate::database::Database;
use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::qb::core::{QbCore, impl_filter_methods};
use crate::qb::table::{JoinType, TableRef};
use crate::qb::traits::{MutationQb, SqlQb};
use crate::value::RowValues;

/// INSERT statement builder.
///
/// ```ignore
/// db.insert()
///     .into("users")
///     .row(RowValues::new().set("id", FilterFunction::Uuid).set("name", "a'b"))
///     .exec(&["users"])?;
/// // INSERT  INTO `users` (`id`,`name`) VALUES (UUID(),'a\'b')
/// ```
#[derive(Debug, Clone)]
pub struct InsertQb<'db> {
    core: QbCore<'db>,
    replace: bool,
    flags: Vec<String>,
    on_duplicate: Vec<String>,
}

impl<'db> InsertQb<'db> {
    /// `REPLACE` among `flags` (any case) turns the statement into a REPLACE.
    pub fn new(db: &'db Database, flags: &[&str]) -> Self {
        let mut qb = Self {
            core: QbCore::new(db, "INSERT", false, false),
            replace: false,
            flags: Vec::new(),
            on_duplicate: Vec::new(),
        };
        for flag in flags {
            qb.add_flag(flag);
        }
        qb
    }

    fn add_flag(&mut self, flag: &str) {
        let flag = flag.trim().to_ascii_uppercase();
        if flag.is_empty() {
            return;
        }
        if flag == "REPLACE" {
            self.replace = true;
        } else if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Add a modifier such as `DELAYED` or `HIGH_PRIORITY`.
    pub fn flag(mut self, flag: &str) -> Self {
        self.add_flag(flag);
        self
    }

    pub fn ignore(self) -> Self {
        self.flag("IGNORE")
    }

    /// The target table. Only one is allowed.
    pub fn into(mut self, table: impl Into<TableRef>) -> Self {
        if self.core.tables.is_empty() {
            self.core
                .join(table.into(), Some("T"), None, None, JoinType::Inner);
        } else {
            self.core.record(DbError::usage("only one table allowed"));
        }
        self
    }

    pub fn row(mut self, row: RowValues) -> Self {
        self.core.rows.push(row);
        self
    }

    pub fn values<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = RowValues>,
    {
        self.core.rows.extend(rows);
        self
    }

    /// On a key conflict, overwrite these columns with the inserted values.
    pub fn on_duplicate_key_update<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref().to_string();
            if !self.on_duplicate.contains(&column) {
                self.on_duplicate.push(column);
            }
        }
        self
    }
}

impl_filter_methods!(InsertQb);

impl SqlQb for InsertQb<'_> {
    fn build_query(&self) -> DbResult<String> {
        self.core.check()?;
        let dialect = self.core.dialect();
        if dialect == Dialect::TSql {
            if self.replace {
                return Err(DbError::unsupported("REPLACE on T-SQL"));
            }
            if !self.on_duplicate.is_empty() {
                return Err(DbError::unsupported("ON DUPLICATE KEY UPDATE on T-SQL"));
            }
        }

        let table = self.core.table_list("INTO")?;
        let rows = self.core.prepare_rows()?;
        if rows.values.is_empty() {
            return Err(DbError::configuration("INSERT: no rows to write"));
        }

        let tuples: Vec<String> = rows
            .values
            .iter()
            .map(|row| format!("({})", row.join(",")))
            .collect();

        let mut sql = format!(
            "{} {} INTO {table} ({}) VALUES {}",
            if self.replace { "REPLACE" } else { "INSERT" },
            self.flags.join(" "),
            rows.columns.join(","),
            tuples.join(",")
        );

        if !self.on_duplicate.is_empty() {
            let updates: Vec<String> = self
                .on_duplicate
                .iter()
                .map(|c| {
                    let col = dialect.quote_ident(c);
                    format!("{col} = VALUES({col})")
                })
                .collect();
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates.join(","));
        }

        Ok(sql)
    }

    fn database(&self) -> &Database {
        self.core.db
    }
}

impl MutationQb for InsertQb<'_> {}
