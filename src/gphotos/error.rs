use thiserror::Error;

#[derive(Debug, Error)]
pub enum GPhotosError {
    #[error("failed login: {0}")]
    FailedLogin(String),

    #[error("API error {status} from {endpoint}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GPhotosError {
    /// Whether this error is transient and worth retrying.
    ///
    /// Rate limits and server errors are transient; auth failures and
    /// malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GPhotosError::Api { status, .. } => *status == 429 || *status >= 500,
            GPhotosError::Http(e) => e.is_timeout() || e.is_connect(),
            GPhotosError::FailedLogin(_) => false,
            GPhotosError::Io(_) => false,
            GPhotosError::Json(_) => false,
        }
    }
}
