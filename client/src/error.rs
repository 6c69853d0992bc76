use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The identity provider has no signed-in user.
    #[error("no signed-in session")]
    NoSession,

    /// The API rejected the caller's token.
    #[error("not authorized")]
    Unauthorized,

    /// The caller has no verification record yet.
    #[error("user is not registered")]
    NotRegistered,

    #[error("request failed: {0}")]
    Http(String),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::InvalidResponse(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::NoSession | Self::Unauthorized | Self::NotRegistered => false,
        }
    }
}
