use base64::Engine;
use rusqlite::{
    types::{Value as SqlValue, ValueRef},
    Connection, Row,
};

use crate::{
    core::types::{DbRow, RawValue},
    error::{AppError, AppResult},
};

/// A parameter value paired with the placeholder it fills (`$1`, `:name`).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub placeholder: String,
    pub value: RawValue,
}

/// Runs SQL text with ordered parameters and returns the rows.
pub trait Executor {
    fn exec_params(&self, sql: &str, params: &[BoundParam]) -> AppResult<Vec<DbRow>>;
}

impl Executor for Connection {
    fn exec_params(&self, sql: &str, params: &[BoundParam]) -> AppResult<Vec<DbRow>> {
        let mut stmt = self.prepare(sql)?;
        for p in params {
            let idx = stmt.parameter_index(&p.placeholder)?.ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "placeholder {} does not appear in the SQL",
                    p.placeholder
                ))
            })?;
            stmt.raw_bind_parameter(idx, to_sql_value(&p.value))?;
        }

        let col_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = Vec::new();
        let mut r = stmt.raw_query();
        while let Some(row) = r.next()? {
            rows.push(row_to_json_object(row, &col_names)?);
        }
        tracing::debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }
}

fn to_sql_value(v: &RawValue) -> SqlValue {
    match v {
        RawValue::Null => SqlValue::Null,
        RawValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        RawValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        RawValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn row_to_json_object(row: &Row<'_>, col_names: &[String]) -> AppResult<DbRow> {
    let mut out = DbRow::with_capacity(col_names.len());
    for (i, name) in col_names.iter().enumerate() {
        let v = match row.get_ref(i)? {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(x) => RawValue::from(x),
            ValueRef::Real(x) => RawValue::from(x),
            ValueRef::Text(t) => RawValue::from(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => serde_json::json!({
                "$type": "blob",
                "base64": base64::engine::general_purpose::STANDARD.encode(b),
                "size": b.len()
            }),
        };
        out.insert(name.clone(), v);
    }
    Ok(out)
}
