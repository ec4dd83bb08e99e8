use crate::error::SyncError;
use crate::model::TaskPayload;
use reqwest::StatusCode;

/// Create one task in `list_id`. Only 200 and 201 count as created.
pub async fn create_task(
    http: &reqwest::Client,
    base_url: &str,
    token: &str,
    list_id: &str,
    task: &TaskPayload,
) -> Result<(), SyncError> {
    let url = format!("{}/list/{list_id}/task", base_url.trim_end_matches('/'));
    let resp = http
        .post(url)
        .header(reqwest::header::AUTHORIZATION, token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .json(task)
        .send()
        .await
        .map_err(|e| {
            SyncError::DeliveryFailure(format!("ClickUp unreachable: {}", e.without_url()))
        })?;

    match resp.status() {
        StatusCode::OK | StatusCode::CREATED => Ok(()),
        status => {
            let body = resp.text().await.unwrap_or_default();
            Err(SyncError::DeliveryFailure(format!(
                "ClickUp returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )))
        }
    }
}
