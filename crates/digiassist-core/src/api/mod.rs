// Remote session API: the I/O boundary to the diagnostic backend.
//
// `SessionApi` is the seam the flow controller and the app depend on;
// `HttpSessionClient` is the production implementation over reqwest.

pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpSessionClient;
pub use types::{
    AnswerReceipt, CompanyProfile, CompanySize, IntakeError, MaturityLevel, NextQuestion, Sector,
    ServedQuestion, SessionCreated, SessionId, SessionResults,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, timeout, ...).
    #[error("network error: {message}")]
    Transport { message: String },

    /// The server answered with a non-success status.
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response: {message}")]
    Decode { message: String },
}

impl ApiError {
    /// Text suitable for showing inline to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { detail, .. } if !detail.is_empty() => detail.clone(),
            ApiError::Server { status, .. } => format!("The server returned an error ({status})"),
            ApiError::Transport { .. } => "Unable to reach the diagnostic service".to_string(),
            ApiError::Decode { .. } => "The diagnostic service sent an unexpected response".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode {
                message: err.to_string(),
            }
        } else {
            ApiError::Transport {
                message: err.to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SessionApi trait
// ---------------------------------------------------------------------------

/// Remote operations on a diagnostic session.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Create a session for a registered company.
    async fn create_session(&self, company_id: &str) -> Result<SessionCreated, ApiError>;

    /// Create a session carrying a temporary, unregistered company.
    async fn create_session_with_company(
        &self,
        company: &CompanyProfile,
    ) -> Result<SessionCreated, ApiError>;

    async fn next_question(&self, session: &SessionId) -> Result<NextQuestion, ApiError>;

    async fn submit_answer(
        &self,
        session: &SessionId,
        text: &str,
    ) -> Result<AnswerReceipt, ApiError>;

    async fn results(&self, session: &SessionId) -> Result<SessionResults, ApiError>;

    /// Raw bytes of the PDF report.
    async fn download_report(&self, session: &SessionId) -> Result<Vec<u8>, ApiError>;
}
