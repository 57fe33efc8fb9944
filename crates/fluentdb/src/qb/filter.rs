//! WHERE predicates, ORDER BY items and pagination.

use std::str::FromStr;

use crate::error::{DbError, DbResult};
use crate::prepare::{PrepareOptions, ValuePreparer};
use crate::value::SqlValue;

/// Comparison operator of a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Rendered through `equals`, so they accept `NULL` and lists.
    fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

impl FromStr for CompareOp {
    type Err = DbError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> DbResult<Self> {
        let op = s.trim().to_ascii_lowercase();
        let op = op.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match op.as_str() {
            "=" | "==" | "in" => Self::Eq,
            "!=" | "<>" | "!" | "not" | "is not" | "not in" => Self::NotEq,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::LtEq,
            ">=" => Self::GtEq,
            "like" => Self::Like,
            "not like" => Self::NotLike,
            "is null" => Self::IsNull,
            "is not null" => Self::IsNotNull,
            _ => return Err(DbError::usage(format!("WHERE operator '{s}' not understood"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Raw(String),
    Compare {
        column: String,
        op: CompareOp,
        value: SqlValue,
    },
}

impl Predicate {
    /// Build a comparison, rejecting lists under ordering and LIKE operators.
    pub fn compare(column: String, op: CompareOp, value: SqlValue) -> DbResult<Self> {
        if matches!(value, SqlValue::List(_)) && !op.is_equality() {
            return Err(DbError::usage(format!(
                "WHERE operator {} cannot take a list",
                op.sql()
            )));
        }
        Ok(Self::Compare { column, op, value })
    }

    pub fn render(&self, preparer: &ValuePreparer<'_>) -> String {
        match self {
            Self::Raw(sql) => sql.clone(),
            Self::Compare { column, op, value } => match op {
                CompareOp::Eq => format!("{column}{}", preparer.equals(value, false)),
                CompareOp::NotEq => format!("{column}{}", preparer.equals(value, true)),
                CompareOp::IsNull | CompareOp::IsNotNull => format!("{column} {}", op.sql()),
                _ => format!(
                    "{column} {} {}",
                    op.sql(),
                    preparer.prepare(value, &PrepareOptions::default())
                ),
            },
        }
    }
}

/// `WHERE a AND b ...`, or nothing.
pub(crate) fn build_where(predicates: &[Predicate], preparer: &ValuePreparer<'_>) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = predicates.iter().map(|p| p.render(preparer)).collect();
    format!("WHERE {}", parts.join(" AND "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OrderItem {
    Column { column: String, descending: bool },
    Raw(String),
}

impl OrderItem {
    fn render(&self) -> String {
        match self {
            Self::Column { column, descending } => {
                format!("{column} {}", if *descending { "DESC" } else { "ASC" })
            }
            Self::Raw(sql) => sql.clone(),
        }
    }
}

/// `ORDER BY a,b`, or nothing.
pub(crate) fn build_order(items: &[OrderItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = items.iter().map(OrderItem::render).collect();
    format!("ORDER BY {}", parts.join(","))
}

/// `offset` rows skipped, at most `count` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: u64,
}

impl Limit {
    /// One argument is a count, two are `offset, count`. Negative values count as zero.
    pub fn from_args(args: &[i64]) -> DbResult<Self> {
        let clamp = |v: i64| v.max(0) as u64;
        match args {
            [count] => Ok(Self {
                offset: 0,
                count: clamp(*count),
            }),
            [offset, count] => Ok(Self {
                offset: clamp(*offset),
                count: clamp(*count),
            }),
            _ => Err(DbError::usage(format!(
                "limit takes one or two arguments, got {}",
                args.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn render(op: &str, value: SqlValue) -> String {
        let op: CompareOp = op.parse().unwrap();
        Predicate::compare("`T`.`x`".to_string(), op, value)
            .unwrap()
            .render(&ValuePreparer::manual(Dialect::Generic))
    }

    #[test]
    fn operator_table() {
        assert_eq!(render("=", 5.into()), "`T`.`x` = 5");
        assert_eq!(render("==", "a".into()), "`T`.`x` = 'a'");
        assert_eq!(render("=", SqlValue::Null), "`T`.`x` IS NULL");
        assert_eq!(render("!=", SqlValue::Null), "`T`.`x` IS NOT NULL");
        assert_eq!(render("<>", 5.into()), "`T`.`x` <> 5");
        assert_eq!(render("NOT", 5.into()), "`T`.`x` <> 5");
        assert_eq!(render("is not", SqlValue::Null), "`T`.`x` IS NOT NULL");
        assert_eq!(render("<", 5.into()), "`T`.`x` < 5");
        assert_eq!(render(">", 5.into()), "`T`.`x` > 5");
        assert_eq!(render("<=", 5.into()), "`T`.`x` <= 5");
        assert_eq!(render(">=", 5.into()), "`T`.`x` >= 5");
        assert_eq!(render("like", "a%".into()), "`T`.`x` LIKE 'a%'");
        assert_eq!(render("Not  Like", "a%".into()), "`T`.`x` NOT LIKE 'a%'");
        assert_eq!(render("in", vec![1, 2].into()), "`T`.`x` IN (1,2)");
        assert_eq!(render("not in", vec![1, 2].into()), "`T`.`x` NOT IN (1,2)");
        assert_eq!(render("IS NULL", SqlValue::Null), "`T`.`x` IS NULL");
        assert_eq!(render("is not null", 1.into()), "`T`.`x` IS NOT NULL");
    }

    #[test]
    fn unknown_operator_is_a_usage_error() {
        assert!("~=".parse::<CompareOp>().unwrap_err().is_usage());
        assert!("between".parse::<CompareOp>().unwrap_err().is_usage());
    }

    #[test]
    fn list_with_ordering_operator_is_rejected() {
        let err = Predicate::compare("x".into(), CompareOp::Lt, vec![1, 2].into()).unwrap_err();
        assert!(err.is_usage());
        assert!(Predicate::compare("x".into(), CompareOp::Like, vec!["a"].into()).is_err());
    }

    #[test]
    fn where_and_order_rendering() {
        let preparer = ValuePreparer::manual(Dialect::Generic);
        assert_eq!(build_where(&[], &preparer), "");
        let preds = vec![
            Predicate::Raw("a = b".into()),
            Predicate::compare("`c`".into(), CompareOp::Eq, 1.into()).unwrap(),
        ];
        assert_eq!(build_where(&preds, &preparer), "WHERE a = b AND `c` = 1");

        assert_eq!(build_order(&[]), "");
        let items = vec![
            OrderItem::Column {
                column: "`y`".into(),
                descending: true,
            },
            OrderItem::Raw("RAND()".into()),
        ];
        assert_eq!(build_order(&items), "ORDER BY `y` DESC,RAND()");
    }

    #[test]
    fn limit_arity() {
        assert_eq!(Limit::from_args(&[10]).unwrap(), Limit { offset: 0, count: 10 });
        assert_eq!(Limit::from_args(&[5, 10]).unwrap(), Limit { offset: 5, count: 10 });
        assert_eq!(Limit::from_args(&[-5, 10]).unwrap().offset, 0);
        assert!(Limit::from_args(&[]).unwrap_err().is_usage());
        assert!(Limit::from_args(&[1, 2, 3]).unwrap_err().is_usage());
    }
}
