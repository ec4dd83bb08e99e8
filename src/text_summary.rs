//! Text rendering for chat messages and console output.

use crate::model::{value_text, Row, RunOutcome};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Numbered listing of rows, one line each: `1. key: value | key: value`.
pub(crate) fn build_rows_summary(rows: &[Row]) -> String {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let fields: Vec<String> = row
                .fields()
                .map(|(k, v)| format!("{k}: {}", value_text(v)))
                .collect();
            format!("{}. {}", i + 1, fields.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Console report for a finished run.
pub(crate) fn build_text_summary(outcome: &RunOutcome) -> TextSummary {
    let mut lines = Vec::new();
    match outcome {
        RunOutcome::Success(summary) => {
            lines.push(format!(
                "Query {}: {} rows ({:?} fetch)",
                summary.query_id, summary.row_count, summary.strategy
            ));
            if let Some(id) = summary.result_id.as_deref() {
                lines.push(format!("Result id: {id}"));
            }
            lines.push(format!(
                "Delivered via {:?}: {} ok, {} failed",
                summary.delivery, summary.report.delivered, summary.report.failed
            ));
        }
        RunOutcome::Skipped(reason) => {
            lines.push(format!("Skipped: {reason}"));
        }
        RunOutcome::Failed { error, .. } => {
            lines.push(format!("Failed: {error}"));
        }
    }
    TextSummary { lines }
}
