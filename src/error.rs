use crate::model::JobStatus;

/// Failures a sync run can hit, from configuration through delivery.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("missing required configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("invalid configuration for {name}: {reason}")]
    ConfigInvalid { name: &'static str, reason: String },

    #[error("{endpoint} unreachable: {source}")]
    UpstreamUnavailable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    UpstreamError { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },

    #[error("refresh job {job_id} ended as {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    JobFailed {
        job_id: String,
        status: JobStatus,
        message: Option<String>,
    },

    #[error("refresh job {job_id} still running after {attempts} polls")]
    PollingTimeout { job_id: String, attempts: u32 },

    #[error("delivery failed: {0}")]
    DeliveryFailure(String),
}

impl SyncError {
    /// Wrap a transport error. The URL is dropped because query-string
    /// credentials would otherwise end up in logs and chat messages.
    pub(crate) fn unavailable(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        SyncError::UpstreamUnavailable {
            endpoint: endpoint.into(),
            source: source.without_url(),
        }
    }

    pub(crate) fn malformed(endpoint: impl Into<String>, detail: impl Into<String>) -> Self {
        SyncError::MalformedResponse {
            endpoint: endpoint.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn is_config(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigMissing(_) | SyncError::ConfigInvalid { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failed_includes_server_message_when_present() {
        let with = SyncError::JobFailed {
            job_id: "abc".into(),
            status: JobStatus::Failure,
            message: Some("syntax error".into()),
        };
        assert_eq!(
            with.to_string(),
            "refresh job abc ended as FAILURE: syntax error"
        );

        let without = SyncError::JobFailed {
            job_id: "abc".into(),
            status: JobStatus::Cancelled,
            message: None,
        };
        assert_eq!(without.to_string(), "refresh job abc ended as CANCELLED");
    }

    #[test]
    fn config_errors_are_classified() {
        assert!(SyncError::ConfigMissing("QUERY_ID").is_config());
        assert!(!SyncError::PollingTimeout {
            job_id: "j".into(),
            attempts: 10
        }
        .is_config());
    }
}
