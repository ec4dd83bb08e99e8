use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

use crate::run_log::RunLog;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub redash_url: String,
    pub api_key: String,
    pub query_id: String,
    pub strategy: FetchStrategy,
    pub poll: PollPolicy,
    pub delivery: DeliveryMode,
    pub clickup: Option<ClickUpConfig>,
    pub webhook_url: Option<String>,
    pub signal_field: Option<String>,
    pub http_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct ClickUpConfig {
    pub base_url: String,
    pub token: String,
    pub list_id: String,
    pub task_status: String,
}

/// How the run obtains its rows. The two strategies never compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Read whatever result the query service has cached.
    Cached,
    /// Recompute the query server-side and wait for it.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One ClickUp task per row.
    Tasks,
    /// A single Slack message summarising all rows.
    Chat,
}

/// Fixed-interval, fixed-count polling. No backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

/// One result row. Field names are whatever the query selects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value of the first key present and non-null.
    pub fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .find(|v| !v.is_null())
    }

    /// Display text of the first key present, or `default`.
    pub fn text_or(&self, keys: &[&str], default: &str) -> String {
        self.first_of(keys)
            .map(value_text)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Row(map)
    }
}

/// Render a JSON value the way a person would write it: strings bare,
/// everything else in its JSON form.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A result snapshot. Rows are never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    rows: Vec<Row>,
    result_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    fetched_at: OffsetDateTime,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>, result_id: Option<String>) -> Self {
        Self {
            rows,
            result_id,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn result_id(&self) -> Option<&str> {
        self.result_id.as_deref()
    }

    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }
}

/// Redash job states, by their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Started,
    Success,
    Failure,
    Cancelled,
    /// A code this client does not know. Treated as still running.
    Unknown(i64),
}

impl JobStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => JobStatus::Pending,
            2 => JobStatus::Started,
            3 => JobStatus::Success,
            4 => JobStatus::Failure,
            5 => JobStatus::Cancelled,
            other => JobStatus::Unknown(other),
        }
    }

    pub fn is_terminal_failure(self) -> bool {
        matches!(self, JobStatus::Failure | JobStatus::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("PENDING"),
            JobStatus::Started => f.write_str("STARTED"),
            JobStatus::Success => f.write_str("SUCCESS"),
            JobStatus::Failure => f.write_str("FAILURE"),
            JobStatus::Cancelled => f.write_str("CANCELLED"),
            JobStatus::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Snapshot of a refresh job as last reported by the query service.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshJob {
    pub job_id: String,
    pub status: JobStatus,
    pub result_id: Option<String>,
    pub error: Option<String>,
}

/// Body of a ClickUp create-task request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPayload {
    pub name: String,
    pub description: String,
    pub status: String,
}

/// Where a run's output goes.
#[derive(Debug, Clone)]
pub enum DeliveryTarget {
    TaskCreation {
        list_id: String,
        tasks: Vec<TaskPayload>,
    },
    ChatMessage {
        title: String,
        body: String,
    },
}

/// Counts of what the notifier managed to deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub query_id: String,
    pub strategy: FetchStrategy,
    pub delivery: DeliveryMode,
    pub row_count: usize,
    pub result_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
    pub report: DeliveryReport,
}

#[derive(Debug)]
pub enum RunOutcome {
    Success(RunSummary),
    /// Nothing to deliver. Not an error.
    Skipped(String),
    Failed { error: String, log: RunLog },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success(_) | RunOutcome::Skipped(_) => 0,
            RunOutcome::Failed { .. } => 1,
        }
    }
}

/// Serialisable view of an outcome for `--json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunReport<'a> {
    Success {
        #[serde(flatten)]
        summary: &'a RunSummary,
    },
    Skipped {
        reason: &'a str,
    },
    Failed {
        error: &'a str,
        log: &'a [String],
    },
}

impl<'a> From<&'a RunOutcome> for RunReport<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success(summary) => RunReport::Success { summary },
            RunOutcome::Skipped(reason) => RunReport::Skipped { reason },
            RunOutcome::Failed { error, log } => RunReport::Failed {
                error,
                log: log.lines(),
            },
        }
    }
}
