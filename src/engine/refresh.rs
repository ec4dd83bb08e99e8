use crate::engine::QueryApi;
use crate::error::SyncError;
use crate::model::{JobStatus, PollPolicy, QueryResult};
use crate::run_log::RunLog;

/// Where the poll loop stands after each job-status read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollState {
    Polling { attempt: u32 },
    Succeeded { result_id: String },
    Failed { status: JobStatus, message: Option<String> },
    TimedOut,
}

/// Trigger a recomputation of `query_id`, wait for the job, then fetch the
/// fresh result it produced.
///
/// Polls at most `poll.max_attempts` times with a fixed `poll.interval`
/// between polls. A job that reports failure or cancellation ends the loop
/// immediately.
pub async fn refresh_and_fetch<A: QueryApi>(
    api: &A,
    query_id: &str,
    poll: &PollPolicy,
    log: &mut RunLog,
) -> Result<QueryResult, SyncError> {
    log.info(format!("Triggering refresh for query {query_id}"));
    let job_id = api.trigger_refresh(query_id).await?;
    log.info(format!("Refresh job {job_id} started"));

    let mut state = PollState::Polling { attempt: 0 };
    let result_id = loop {
        state = match state {
            PollState::Polling { attempt } if attempt >= poll.max_attempts => PollState::TimedOut,
            PollState::Polling { attempt } => {
                let attempt = attempt + 1;
                let job = api.job(&job_id).await?;
                log.info(format!(
                    "Poll {attempt}/{}: job {} is {}",
                    poll.max_attempts, job.job_id, job.status
                ));
                match job.status {
                    JobStatus::Success => match job.result_id {
                        Some(result_id) => PollState::Succeeded { result_id },
                        None => {
                            return Err(SyncError::malformed(
                                format!("GET /api/jobs/{job_id}"),
                                "job succeeded without query_result_id",
                            ))
                        }
                    },
                    status if status.is_terminal_failure() => PollState::Failed {
                        status,
                        message: job.error,
                    },
                    _ => {
                        // No point sleeping once the budget is spent.
                        if attempt < poll.max_attempts {
                            tokio::time::sleep(poll.interval).await;
                        }
                        PollState::Polling { attempt }
                    }
                }
            }
            PollState::Succeeded { result_id } => break result_id,
            PollState::Failed { status, message } => {
                let err = SyncError::JobFailed {
                    job_id,
                    status,
                    message,
                };
                log.error(err.to_string());
                return Err(err);
            }
            PollState::TimedOut => {
                let err = SyncError::PollingTimeout {
                    job_id,
                    attempts: poll.max_attempts,
                };
                log.error(err.to_string());
                return Err(err);
            }
        };
    };

    log.info(format!("Fetching query result {result_id}"));
    let result = api.result_by_id(&result_id).await?;
    log.info(format!("Fresh result has {} rows", result.rows().len()));
    Ok(result)
}
