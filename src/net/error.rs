use thiserror::Error;

/// Transport-level fetch failures.
///
/// An HTTP error status is not a `FetchError` - the transport delivered a
/// response, and the agent passes it through. Only failures to produce any
/// response at all land here, which is exactly the condition that triggers
/// the cache fallback for static assets.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Fold a reqwest error into the taxonomy, keeping timeout and
    /// connection refusal distinguishable for logging.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Transport(err)
        }
    }
}
