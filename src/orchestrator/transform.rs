//! Row transforms.
//!
//! Everything here derives new values from a `QueryResult`; rows are only
//! ever read.

use crate::model::{QueryResult, Row, TaskPayload};
use serde_json::Value;

const NAME_KEYS: &[&str] = &["metric_name", "name"];
const VALUE_KEYS: &[&str] = &["metric_value", "value"];

/// Why a run has nothing to deliver, if it doesn't.
///
/// Empty results always skip. With `signal_field` set, the first row must
/// also carry a non-empty value for that field.
pub(crate) fn skip_reason(result: &QueryResult, signal_field: Option<&str>) -> Option<String> {
    let Some(first) = result.rows().first() else {
        return Some("query returned no rows".to_string());
    };
    let field = signal_field?;
    if is_blank(first.get(field)) {
        return Some(format!("signal field `{field}` is empty on the first row"));
    }
    None
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

pub(crate) fn task_payload(row: &Row, status: &str) -> TaskPayload {
    TaskPayload {
        name: format!("Metric Alert: {}", row.text_or(NAME_KEYS, "unknown")),
        description: format!("Value: {}", row.text_or(VALUE_KEYS, "n/a")),
        status: status.to_string(),
    }
}

/// One payload per row, in upstream order.
pub(crate) fn task_payloads(rows: &[Row], status: &str) -> Vec<TaskPayload> {
    rows.iter().map(|row| task_payload(row, status)).collect()
}
