//! Delivery of run output.
//!
//! Nothing here is fatal: the notifier is also the failure-reporting channel,
//! so every error is logged and counted instead of propagated.

mod clickup;
mod slack;

use crate::model::{ClickUpConfig, DeliveryReport, DeliveryTarget};
use crate::run_log::RunLog;

pub struct Notifier {
    http: reqwest::Client,
    clickup: Option<ClickUpConfig>,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(
        http: reqwest::Client,
        clickup: Option<ClickUpConfig>,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            http,
            clickup,
            webhook_url,
        }
    }

    pub async fn deliver(&self, target: &DeliveryTarget, log: &mut RunLog) -> DeliveryReport {
        match target {
            DeliveryTarget::TaskCreation { list_id, tasks } => {
                self.create_tasks(list_id, tasks, log).await
            }
            DeliveryTarget::ChatMessage { title, body } => {
                let mut report = DeliveryReport::default();
                match self.post(title, body).await {
                    PostOutcome::Sent => {
                        report.attempted = 1;
                        report.delivered = 1;
                        log.info("Posted message to webhook");
                    }
                    PostOutcome::Unconfigured => {
                        log.warn("No webhook configured; message not sent");
                    }
                    PostOutcome::Failed(reason) => {
                        report.attempted = 1;
                        report.failed = 1;
                        log.warn(format!("Webhook delivery failed: {reason}"));
                    }
                }
                report
            }
        }
    }

    /// Push a failed run's log to the webhook. Best effort.
    pub async fn notify_failure(&self, title: &str, log: &RunLog) {
        match self.post(title, &log.to_text()).await {
            PostOutcome::Sent => tracing::info!("failure report posted to webhook"),
            PostOutcome::Unconfigured => {
                tracing::warn!("no webhook configured; failure report not sent")
            }
            PostOutcome::Failed(reason) => {
                tracing::warn!("could not post failure report: {reason}")
            }
        }
    }

    async fn create_tasks(
        &self,
        list_id: &str,
        tasks: &[crate::model::TaskPayload],
        log: &mut RunLog,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let Some(clickup) = self.clickup.as_ref() else {
            log.warn(format!(
                "ClickUp is not configured; {} tasks not created",
                tasks.len()
            ));
            report.failed = tasks.len();
            return report;
        };

        for (i, task) in tasks.iter().enumerate() {
            report.attempted += 1;
            match clickup::create_task(&self.http, &clickup.base_url, &clickup.token, list_id, task)
                .await
            {
                Ok(()) => {
                    report.delivered += 1;
                    log.info(format!("Created task {}: {}", i + 1, task.name));
                }
                Err(e) => {
                    report.failed += 1;
                    log.warn(format!("Task {} ({}) not created: {e}", i + 1, task.name));
                }
            }
        }
        log.info(format!(
            "Tasks created: {}, failed: {}",
            report.delivered, report.failed
        ));
        report
    }

    async fn post(&self, title: &str, body: &str) -> PostOutcome {
        let Some(url) = self.webhook_url.as_deref() else {
            return PostOutcome::Unconfigured;
        };
        match slack::post_message(&self.http, url, title, body).await {
            Ok(()) => PostOutcome::Sent,
            Err(e) => PostOutcome::Failed(e.to_string()),
        }
    }
}

enum PostOutcome {
    Sent,
    Unconfigured,
    Failed(String),
}
