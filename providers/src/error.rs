use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("identity token is invalid or expired")]
    InvalidToken,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}
