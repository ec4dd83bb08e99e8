//! Result-freshness engine.
//!
//! Obtains a `QueryResult` either from the query service's cache or by
//! forcing a recomputation and waiting for it.

mod cached;
mod redash;
mod refresh;

pub use cached::fetch_cached;
pub use redash::RedashClient;
pub use refresh::refresh_and_fetch;

use crate::error::SyncError;
use crate::model::{FetchStrategy, PollPolicy, QueryResult, RefreshJob};
use crate::run_log::RunLog;

/// Operations the engine needs from the query service.
pub trait QueryApi {
    async fn cached_result(&self, query_id: &str) -> Result<QueryResult, SyncError>;

    /// Start a recomputation and return its job id.
    async fn trigger_refresh(&self, query_id: &str) -> Result<String, SyncError>;

    async fn job(&self, job_id: &str) -> Result<RefreshJob, SyncError>;

    async fn result_by_id(&self, result_id: &str) -> Result<QueryResult, SyncError>;
}

/// Fetch rows with the configured strategy.
pub async fn fetch_result<A: QueryApi>(
    api: &A,
    query_id: &str,
    strategy: FetchStrategy,
    poll: &PollPolicy,
    log: &mut RunLog,
) -> Result<QueryResult, SyncError> {
    match strategy {
        FetchStrategy::Cached => fetch_cached(api, query_id, log).await,
        FetchStrategy::Refresh => refresh_and_fetch(api, query_id, poll, log).await,
    }
}
