use crate::engine::QueryApi;
use crate::error::SyncError;
use crate::model::{JobStatus, QueryResult, RefreshJob, Row};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// HTTP client for the Redash API.
#[derive(Debug, Clone)]
pub struct RedashClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    query_result: Option<ResultBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    data: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    rows: Option<Vec<Row>>,
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: Option<JobBody>,
}

#[derive(Debug, Deserialize)]
struct JobBody {
    id: Option<Value>,
    status: Option<i64>,
    query_result_id: Option<Value>,
    error: Option<String>,
}

/// Redash returns ids as numbers or strings depending on the endpoint.
fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RedashClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn read_json<T: DeserializeOwned>(
        resp: Response,
        endpoint: &str,
    ) -> Result<T, SyncError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::UpstreamError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| SyncError::unavailable(endpoint, e))?;
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::malformed(endpoint, format!("invalid JSON body: {e}")))
    }

    fn rows_of(envelope: ResultEnvelope, endpoint: &str) -> Result<Vec<Row>, SyncError> {
        envelope
            .query_result
            .and_then(|r| r.data)
            .and_then(|d| d.rows)
            .ok_or_else(|| SyncError::malformed(endpoint, "missing query_result.data.rows"))
    }
}

impl QueryApi for RedashClient {
    async fn cached_result(&self, query_id: &str) -> Result<QueryResult, SyncError> {
        let path = format!("/api/queries/{query_id}/results.json");
        let endpoint = format!("GET {path}");
        let resp = self
            .http
            .get(self.url(&path))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SyncError::unavailable(&endpoint, e))?;
        let envelope: ResultEnvelope = Self::read_json(resp, &endpoint).await?;
        let rows = Self::rows_of(envelope, &endpoint)?;
        Ok(QueryResult::new(rows, None))
    }

    async fn trigger_refresh(&self, query_id: &str) -> Result<String, SyncError> {
        let path = format!("/api/queries/{query_id}/refresh");
        let endpoint = format!("POST {path}");
        let resp = self
            .http
            .post(self.url(&path))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| SyncError::unavailable(&endpoint, e))?;
        let envelope: JobEnvelope = Self::read_json(resp, &endpoint).await?;
        envelope
            .job
            .and_then(|j| j.id)
            .as_ref()
            .and_then(id_text)
            .ok_or_else(|| SyncError::malformed(&endpoint, "missing job.id"))
    }

    async fn job(&self, job_id: &str) -> Result<RefreshJob, SyncError> {
        let path = format!("/api/jobs/{job_id}");
        let endpoint = format!("GET {path}");
        let resp = self
            .http
            .get(self.url(&path))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| SyncError::unavailable(&endpoint, e))?;
        let envelope: JobEnvelope = Self::read_json(resp, &endpoint).await?;
        let job = envelope
            .job
            .ok_or_else(|| SyncError::malformed(&endpoint, "missing job"))?;
        let code = job
            .status
            .ok_or_else(|| SyncError::malformed(&endpoint, "missing job.status"))?;
        Ok(RefreshJob {
            job_id: job
                .id
                .as_ref()
                .and_then(id_text)
                .unwrap_or_else(|| job_id.to_string()),
            status: JobStatus::from_code(code),
            result_id: job.query_result_id.as_ref().and_then(id_text),
            error: job.error.filter(|e| !e.trim().is_empty()),
        })
    }

    async fn result_by_id(&self, result_id: &str) -> Result<QueryResult, SyncError> {
        let path = format!("/api/query_results/{result_id}.json");
        let endpoint = format!("GET {path}");
        let resp = self
            .http
            .get(self.url(&path))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| SyncError::unavailable(&endpoint, e))?;
        let envelope: ResultEnvelope = Self::read_json(resp, &endpoint).await?;
        let rows = Self::rows_of(envelope, &endpoint)?;
        Ok(QueryResult::new(rows, Some(result_id.to_string())))
    }
}
