// reqwest-backed implementation of `SessionApi`.
//
// One `reqwest::Client` is shared by all calls; it carries the configured
// timeout and a JSON content type. Non-2xx responses are turned into
// `ApiError::Server` using the backend's `detail` field when present.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{
    AnswerReceipt, CompanyProfile, NextQuestion, SessionCreated, SessionId, SessionResults,
};
use super::{ApiError, SessionApi};
use crate::config::Config;

// ---------------------------------------------------------------------------
// HttpSessionClient
// ---------------------------------------------------------------------------

/// HTTP client for the diagnostic session endpoints.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSessionClient {
    /// Create a client rooted at `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the `[api]` section of the application config.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api.base_url, config.api.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SessionApi for HttpSessionClient {
    async fn create_session(&self, company_id: &str) -> Result<SessionCreated, ApiError> {
        debug!(company_id, "creating session");
        let body = serde_json::json!({ "company_id": company_id });
        let created: SessionCreated = self
            .send_json(self.http.post(self.url("/sessions")).json(&body))
            .await?;
        info!(session_id = %created.session_id, "session created");
        Ok(created)
    }

    async fn create_session_with_company(
        &self,
        company: &CompanyProfile,
    ) -> Result<SessionCreated, ApiError> {
        debug!(company = %company.name, "creating session with temporary company");
        let created: SessionCreated = self
            .send_json(self.http.post(self.url("/sessions/temp")).json(company))
            .await?;
        info!(session_id = %created.session_id, "session created");
        Ok(created)
    }

    async fn next_question(&self, session: &SessionId) -> Result<NextQuestion, ApiError> {
        debug!(%session, "fetching next question");
        let path = format!("/sessions/{session}/next");
        self.send_json(self.http.post(self.url(&path))).await
    }

    async fn submit_answer(
        &self,
        session: &SessionId,
        text: &str,
    ) -> Result<AnswerReceipt, ApiError> {
        debug!(%session, len = text.len(), "submitting answer");
        let path = format!("/sessions/{session}/answers");
        let body = serde_json::json!({ "user_text": text });
        self.send_json(self.http.post(self.url(&path)).json(&body))
            .await
    }

    async fn results(&self, session: &SessionId) -> Result<SessionResults, ApiError> {
        debug!(%session, "fetching results");
        let path = format!("/sessions/{session}/results");
        self.send_json(self.http.get(self.url(&path))).await
    }

    async fn download_report(&self, session: &SessionId) -> Result<Vec<u8>, ApiError> {
        debug!(%session, "downloading report");
        let path = format!("/sessions/{session}/download-pdf");
        let response = check_status(
            self.http
                .get(self.url(&path))
                .header(ACCEPT, "application/pdf")
                .send()
                .await?,
        )
        .await?;
        let bytes = response.bytes().await?;
        info!(%session, size = bytes.len(), "report downloaded");
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Error mapping helpers
// ---------------------------------------------------------------------------

/// Pass successful responses through; turn anything else into
/// `ApiError::Server`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = parse_error_detail(&body).unwrap_or_default();
    warn!(status = status.as_u16(), %detail, "session API request failed");
    Err(ApiError::Server {
        status: status.as_u16(),
        detail,
    })
}

/// Extract the `detail` message from an error body.
///
/// `detail` is either a plain string or, for request validation errors, a
/// list of objects carrying `msg`.
pub(crate) fn parse_error_detail(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    match v.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
