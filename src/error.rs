use thiserror::Error;

/// Unified error type for the tips engine.
///
/// The split matters to callers: `Validation` and `NotFound` block an action
/// locally and are never worth retrying, while `Network`, `Timeout` and
/// `Service` are transport-level and retryable. `InFlight` means a mutation
/// for the same category was still outstanding.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("service error: {0}")]
    Service(String),

    #[error("{0}")]
    NotFound(String),

    #[error("another operation is in flight for {0}")]
    InFlight(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_status() {
            match err.status() {
                Some(status) => Error::Service(format!("backend returned {}", status)),
                None => Error::Service(err.to_string()),
            }
        } else if err.is_decode() {
            // Malformed payloads count as service errors, not transport.
            Error::Service(format!("malformed response: {}", err))
        } else {
            Error::Network(err)
        }
    }
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Whether retrying the same call can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::Service(_) | Error::InFlight(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors_are_not_retryable() {
        assert!(!Error::validation("blank field").is_retryable());
        assert!(!Error::not_found("no bundle").is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        assert!(Error::Timeout.is_retryable());
        assert!(Error::Service("503".to_string()).is_retryable());
        assert!(Error::InFlight("VIP1".to_string()).is_retryable());
    }
}
