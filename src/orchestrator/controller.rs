//! Run lifecycle.
//!
//! Fetch → skip check → transform → deliver. A fatal error at any step stops
//! the run and ships the accumulated log to the webhook.

use crate::engine::{self, QueryApi};
use crate::error::SyncError;
use crate::model::{
    DeliveryMode, DeliveryTarget, QueryResult, RunConfig, RunOutcome, RunSummary,
};
use crate::notify::Notifier;
use crate::orchestrator::transform::{skip_reason, task_payloads};
use crate::run_log::RunLog;
use crate::text_summary::build_rows_summary;

/// Execute one sync run.
pub(crate) async fn run<A: QueryApi>(
    cfg: &RunConfig,
    api: &A,
    notifier: &Notifier,
) -> RunOutcome {
    let mut log = RunLog::new();
    log.info(format!(
        "Sync started: query {}, {:?} fetch, {:?} delivery",
        cfg.query_id, cfg.strategy, cfg.delivery
    ));

    let result =
        match engine::fetch_result(api, &cfg.query_id, cfg.strategy, &cfg.poll, &mut log).await {
            Ok(result) => result,
            Err(e) => return fail(cfg, notifier, log, e).await,
        };

    if let Some(reason) = skip_reason(&result, cfg.signal_field.as_deref()) {
        log.info(format!("Nothing to deliver: {reason}"));
        return RunOutcome::Skipped(reason);
    }

    let target = match build_target(cfg, &result) {
        Ok(target) => target,
        Err(e) => return fail(cfg, notifier, log, e).await,
    };
    let report = notifier.deliver(&target, &mut log).await;

    RunOutcome::Success(RunSummary {
        query_id: cfg.query_id.clone(),
        strategy: cfg.strategy,
        delivery: cfg.delivery,
        row_count: result.rows().len(),
        result_id: result.result_id().map(str::to_string),
        fetched_at: result.fetched_at(),
        report,
    })
}

fn build_target(cfg: &RunConfig, result: &QueryResult) -> Result<DeliveryTarget, SyncError> {
    match cfg.delivery {
        DeliveryMode::Tasks => {
            let clickup = cfg
                .clickup
                .as_ref()
                .ok_or(SyncError::ConfigMissing("CLICKUP_TOKEN"))?;
            Ok(DeliveryTarget::TaskCreation {
                list_id: clickup.list_id.clone(),
                tasks: task_payloads(result.rows(), &clickup.task_status),
            })
        }
        DeliveryMode::Chat => Ok(DeliveryTarget::ChatMessage {
            title: format!(
                "Redash query {}: {} new rows",
                cfg.query_id,
                result.rows().len()
            ),
            body: build_rows_summary(result.rows()),
        }),
    }
}

pub(crate) fn failure_title(query_id: &str) -> String {
    format!("Redash sync failed (query {query_id})")
}

async fn fail(cfg: &RunConfig, notifier: &Notifier, mut log: RunLog, err: SyncError) -> RunOutcome {
    log.error(format!("Run failed: {err}"));
    notifier
        .notify_failure(&failure_title(&cfg.query_id), &log)
        .await;
    RunOutcome::Failed {
        error: err.to_string(),
        log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Call, ScriptedApi};
    use crate::engine::RedashClient;
    use crate::model::{ClickUpConfig, FetchStrategy, JobStatus, PollPolicy, Row};
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn config(server: &MockServer, strategy: FetchStrategy, delivery: DeliveryMode) -> RunConfig {
        RunConfig {
            redash_url: server.base_url(),
            api_key: "secret".into(),
            query_id: "7".into(),
            strategy,
            poll: PollPolicy::default(),
            delivery,
            clickup: Some(ClickUpConfig {
                base_url: server.url("/clickup/api/v2"),
                token: "pk_token".into(),
                list_id: "900".into(),
                task_status: "to do".into(),
            }),
            webhook_url: Some(server.url("/hook")),
            signal_field: None,
            http_timeout: Duration::from_secs(5),
            user_agent: "redash-sync/test".into(),
        }
    }

    fn notifier(cfg: &RunConfig) -> Notifier {
        Notifier::new(
            reqwest::Client::new(),
            cfg.clickup.clone(),
            cfg.webhook_url.clone(),
        )
    }

    fn rows(v: Value) -> Vec<Row> {
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn cached_metric_row_creates_one_task() {
        let server = MockServer::start_async().await;
        let cached = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/queries/7/results.json")
                    .query_param("api_key", "secret");
                then.status(200).json_body(json!({
                    "query_result": {"data": {"rows": [{"metric_name": "m1", "metric_value": 5}]}}
                }));
            })
            .await;
        let task = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/clickup/api/v2/list/900/task")
                    .header("Authorization", "pk_token")
                    .json_body(json!({
                        "name": "Metric Alert: m1",
                        "description": "Value: 5",
                        "status": "to do"
                    }));
                then.status(200).json_body(json!({"id": "abc"}));
            })
            .await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(200);
            })
            .await;

        let cfg = config(&server, FetchStrategy::Cached, DeliveryMode::Tasks);
        let api = RedashClient::new(reqwest::Client::new(), &cfg.redash_url, &cfg.api_key);
        let outcome = run(&cfg, &api, &notifier(&cfg)).await;

        cached.assert_async().await;
        task.assert_hits_async(1).await;
        hook.assert_hits_async(0).await;
        assert_eq!(outcome.exit_code(), 0);
        match outcome {
            RunOutcome::Success(summary) => {
                assert_eq!(summary.row_count, 1);
                assert_eq!(summary.report.delivered, 1);
                assert_eq!(summary.result_id, None);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_polls_until_success_then_reads_result_42() {
        let server = MockServer::start_async().await;
        let mut cfg = config(&server, FetchStrategy::Refresh, DeliveryMode::Chat);
        cfg.poll.interval = Duration::ZERO;
        let api = ScriptedApi::new(&[JobStatus::Pending, JobStatus::Started, JobStatus::Success])
            .with_result_rows(rows(json!([{"merchant_id": "M-9"}])));
        let hook = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .body_contains("merchant_id: M-9");
                then.status(200);
            })
            .await;

        let outcome = run(&cfg, &api, &notifier(&cfg)).await;

        assert_eq!(api.polls(), 3);
        assert_eq!(
            *api.calls.borrow(),
            vec![
                Call::Trigger("7".into()),
                Call::Job("job-1".into()),
                Call::Job("job-1".into()),
                Call::Job("job-1".into()),
                Call::ResultById("42".into()),
            ]
        );
        hook.assert_async().await;
        assert!(matches!(outcome, RunOutcome::Success(ref s) if s.result_id.as_deref() == Some("42")));
    }

    #[tokio::test]
    async fn empty_rows_skip_without_notifying() {
        let server = MockServer::start_async().await;
        let any_post = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        for delivery in [DeliveryMode::Tasks, DeliveryMode::Chat] {
            let cfg = config(&server, FetchStrategy::Cached, delivery);
            let api = ScriptedApi::new(&[]);
            let outcome = run(&cfg, &api, &notifier(&cfg)).await;
            assert!(matches!(outcome, RunOutcome::Skipped(_)), "{outcome:?}");
            assert_eq!(outcome.exit_code(), 0);
        }
        any_post.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn absent_signal_field_skips() {
        let server = MockServer::start_async().await;
        let any_post = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let mut cfg = config(&server, FetchStrategy::Cached, DeliveryMode::Chat);
        cfg.signal_field = Some("ids".into());
        let api = ScriptedApi::new(&[]).with_cached_rows(rows(json!([{"ids": null}])));

        let outcome = run(&cfg, &api, &notifier(&cfg)).await;

        assert!(matches!(outcome, RunOutcome::Skipped(ref r) if r.contains("ids")));
        any_post.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn failed_job_posts_log_to_webhook() {
        let server = MockServer::start_async().await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/hook")
                    .body_contains("Redash sync failed (query 7)")
                    .body_contains("FAILURE");
                then.status(200);
            })
            .await;

        let mut cfg = config(&server, FetchStrategy::Refresh, DeliveryMode::Tasks);
        cfg.poll.interval = Duration::ZERO;
        let api = ScriptedApi::new(&[JobStatus::Started, JobStatus::Failure]);

        let outcome = run(&cfg, &api, &notifier(&cfg)).await;

        hook.assert_async().await;
        assert_eq!(outcome.exit_code(), 1);
        match outcome {
            RunOutcome::Failed { error, log } => {
                assert!(error.contains("FAILURE"), "{error}");
                assert!(log.lines().last().is_some_and(|l| l.contains("[ERROR] Run failed")));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_error_fails_run_even_when_webhook_is_down() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/queries/7/results.json");
                then.status(500);
            })
            .await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(502);
            })
            .await;

        let cfg = config(&server, FetchStrategy::Cached, DeliveryMode::Tasks);
        let api = RedashClient::new(reqwest::Client::new(), &cfg.redash_url, &cfg.api_key);
        let outcome = run(&cfg, &api, &notifier(&cfg)).await;

        hook.assert_async().await;
        assert!(
            matches!(outcome, RunOutcome::Failed { ref error, .. } if error.contains("HTTP 500")),
            "{outcome:?}"
        );
    }
}
