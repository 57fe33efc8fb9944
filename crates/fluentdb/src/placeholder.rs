//! `{{..}}` placeholder substitution for hand-written SQL.
//!
//! For every name three forms are recognized, replaced in this order:
//!
//! - `{{raw:name}}`: the value's text, unescaped
//! - `{{json:name}}`: the value's JSON encoding, as an escaped literal
//! - `{{:name}}`: the value as an escaped literal

use serde_json::Value;

use crate::error::DbResult;
use crate::prepare::{PrepareOptions, ValuePreparer};
use crate::value::SqlValue;

/// Named placeholder values, substituted in insertion order.
pub type Placeholders = serde_json::Map<String, Value>;

/// Replace every placeholder in `sql`.
pub fn substitute(
    sql: &str,
    placeholders: &Placeholders,
    preparer: &ValuePreparer<'_>,
) -> DbResult<String> {
    let opts = PrepareOptions::default();
    let mut sql = sql.to_string();
    for (name, value) in placeholders {
        let raw = format!("{{{{raw:{name}}}}}");
        if sql.contains(&raw) {
            sql = sql.replace(&raw, &raw_text(value));
        }

        let json = format!("{{{{json:{name}}}}}");
        if sql.contains(&json) {
            let encoded = SqlValue::Text(serde_json::to_string(value)?);
            sql = sql.replace(&json, &preparer.prepare(&encoded, &opts));
        }

        let plain = format!("{{{{:{name}}}}}");
        if sql.contains(&plain) {
            let prepared = preparer.prepare(&SqlValue::from(value.clone()), &opts);
            sql = sql.replace(&plain, &prepared);
        }
    }
    Ok(sql)
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}
