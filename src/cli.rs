use crate::engine::RedashClient;
use crate::error::SyncError;
use crate::model::{
    ClickUpConfig, DeliveryMode, FetchStrategy, PollPolicy, RunConfig, RunOutcome, RunReport,
};
use crate::notify::Notifier;
use crate::run_log::RunLog;
use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "redash-sync",
    version,
    about = "Relay Redash query results to ClickUp tasks or a Slack webhook"
)]
pub struct Cli {
    /// Base URL of the Redash instance
    #[arg(long, env = "REDASH_URL")]
    pub redash_url: Option<String>,

    /// Redash API key
    #[arg(long, env = "REDASH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Saved query to read
    #[arg(long, env = "QUERY_ID")]
    pub query_id: Option<String>,

    /// ClickUp personal token
    #[arg(long, env = "CLICKUP_TOKEN", hide_env_values = true)]
    pub clickup_token: Option<String>,

    /// ClickUp list that receives new tasks
    #[arg(long, env = "CLICKUP_LIST_ID")]
    pub clickup_list_id: Option<String>,

    /// ClickUp API base URL
    #[arg(long, env = "CLICKUP_BASE_URL", default_value = "https://api.clickup.com/api/v2")]
    pub clickup_base_url: String,

    /// Status given to created tasks
    #[arg(long, env = "CLICKUP_TASK_STATUS", default_value = "to do")]
    pub task_status: String,

    /// Slack incoming-webhook URL for messages and failure reports
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Recompute the query and wait for fresh results instead of reading the cache
    #[arg(long, env = "REFRESH_QUERY", value_parser = BoolishValueParser::new())]
    pub refresh: bool,

    /// Job-status polls before giving up on a refresh
    #[arg(long, env = "POLL_MAX_ATTEMPTS", default_value_t = 10)]
    pub max_attempts: u32,

    /// Fixed delay between job-status polls
    #[arg(long, env = "POLL_INTERVAL", default_value = "5s")]
    pub poll_interval: humantime::Duration,

    /// Timeout applied to every HTTP request
    #[arg(long, env = "HTTP_TIMEOUT", default_value = "30s")]
    pub http_timeout: humantime::Duration,

    /// Where rows go: one ClickUp task per row, or one Slack message
    #[arg(long, env = "DELIVER", value_enum, default_value_t = DeliveryMode::Tasks)]
    pub deliver: DeliveryMode,

    /// Skip the run when this field is empty on the first row
    #[arg(long, env = "SIGNAL_FIELD")]
    pub signal_field: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long)]
    pub silent: bool,
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, SyncError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(SyncError::ConfigMissing(name))
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build a validated `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<RunConfig, SyncError> {
    let redash_url = required(&args.redash_url, "REDASH_URL")?;
    let api_key = required(&args.api_key, "REDASH_API_KEY")?;
    let query_id = required(&args.query_id, "QUERY_ID")?;
    let webhook_url = optional(&args.webhook_url);

    let clickup = match args.deliver {
        DeliveryMode::Tasks => Some(ClickUpConfig {
            base_url: args.clickup_base_url.clone(),
            token: required(&args.clickup_token, "CLICKUP_TOKEN")?,
            list_id: required(&args.clickup_list_id, "CLICKUP_LIST_ID")?,
            task_status: args.task_status.clone(),
        }),
        DeliveryMode::Chat => {
            if webhook_url.is_none() {
                return Err(SyncError::ConfigMissing("SLACK_WEBHOOK_URL"));
            }
            None
        }
    };

    if args.max_attempts == 0 {
        return Err(SyncError::ConfigInvalid {
            name: "POLL_MAX_ATTEMPTS",
            reason: "must be at least 1".into(),
        });
    }

    Ok(RunConfig {
        redash_url,
        api_key,
        query_id,
        strategy: if args.refresh {
            FetchStrategy::Refresh
        } else {
            FetchStrategy::Cached
        },
        poll: PollPolicy {
            max_attempts: args.max_attempts,
            interval: Duration::from(args.poll_interval),
        },
        delivery: args.deliver,
        clickup,
        webhook_url,
        signal_field: optional(&args.signal_field),
        http_timeout: Duration::from(args.http_timeout),
        user_agent: format!("redash-sync/{}", env!("CARGO_PKG_VERSION")),
    })
}

fn http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .context("failed to build HTTP client")
}

/// Validate configuration, run one sync, and print the report.
pub async fn run(args: Cli) -> Result<RunOutcome> {
    let cfg = match build_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            report_config_error(&args, &e).await;
            return Err(e).context("invalid configuration");
        }
    };

    let http = http_client(cfg.http_timeout, &cfg.user_agent)?;
    let api = RedashClient::new(http.clone(), &cfg.redash_url, &cfg.api_key);
    let notifier = Notifier::new(http, cfg.clickup.clone(), cfg.webhook_url.clone());

    let outcome = crate::orchestrator::run(&cfg, &api, &notifier).await;
    print_outcome(&args, &outcome)?;
    Ok(outcome)
}

/// Best-effort failure report for a run that never got a valid config.
async fn report_config_error(args: &Cli, err: &SyncError) {
    report_setup_failure(
        optional(&args.webhook_url),
        optional(&args.query_id),
        Duration::from(args.http_timeout),
        format!("Run failed: {err}"),
    )
    .await;
}

/// Best-effort failure report for arguments clap rejected. Only the raw
/// environment is available at this point.
pub async fn report_usage_error(
    err: &clap::Error,
    webhook_url: Option<String>,
    query_id: Option<String>,
) {
    report_setup_failure(
        optional(&webhook_url),
        optional(&query_id),
        Duration::from_secs(30),
        format!("Invalid arguments: {}", err.to_string().trim_end()),
    )
    .await;
}

async fn report_setup_failure(
    webhook_url: Option<String>,
    query_id: Option<String>,
    timeout: Duration,
    message: String,
) {
    let Some(url) = webhook_url else {
        return;
    };
    let Ok(http) = http_client(timeout, "redash-sync") else {
        return;
    };
    let mut log = RunLog::new();
    log.error(message);
    let query = query_id.unwrap_or_else(|| "?".into());
    Notifier::new(http, None, Some(url))
        .notify_failure(&crate::orchestrator::failure_title(&query), &log)
        .await;
}

fn print_outcome(args: &Cli, outcome: &RunOutcome) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let json = serde_json::to_string_pretty(&RunReport::from(outcome))?;
        writeln!(out, "{json}")?;
    } else if !args.silent {
        for line in crate::text_summary::build_text_summary(outcome).lines {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}
