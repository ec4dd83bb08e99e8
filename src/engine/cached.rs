use crate::engine::QueryApi;
use crate::error::SyncError;
use crate::model::QueryResult;
use crate::run_log::RunLog;

/// Read the cached result for `query_id`. One attempt, no retries.
pub async fn fetch_cached<A: QueryApi>(
    api: &A,
    query_id: &str,
    log: &mut RunLog,
) -> Result<QueryResult, SyncError> {
    log.info(format!("Fetching cached result for query {query_id}"));
    let result = api.cached_result(query_id).await?;
    log.info(format!("Cached result has {} rows", result.rows().len()));
    Ok(result)
}
