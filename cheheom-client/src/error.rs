use std::time::Duration;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl SyncError {
    /// Whether replaying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Timeout(_) | SyncError::Network(_) => true,
            // 401 means the token lapsed; the request is fine under a fresh one.
            SyncError::Server { status, .. } => *status >= 500 || *status == 401,
            SyncError::Decode(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or malformed input; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The operation is not allowed in the current state; nothing changed.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("local storage unavailable: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    /// Timeouts and connection failures, shown as "slow network" rather than a generic failure.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Sync(SyncError::Timeout(_) | SyncError::Network(_)))
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(SyncError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(SyncError::Network("refused".into()).is_transient());
        assert!(SyncError::Server { status: 503, message: "down".into() }.is_transient());
        assert!(!SyncError::Server { status: 409, message: "dup".into() }.is_transient());
        assert!(!SyncError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn timeout_is_a_network_problem() {
        let err = ClientError::from(SyncError::Timeout(Duration::from_secs(15)));
        assert!(err.is_network());
        let err = ClientError::from(SyncError::Server { status: 401, message: "bad".into() });
        assert!(!err.is_network());
    }
}
