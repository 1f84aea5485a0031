//! Unified error types for the caching worker.
//!
//! Display strings carry a stable prefix so hosts can log and match on the
//! error class without inspecting variants.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the registry, the worker and its hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty partition name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded back into a response.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Attempted to store a response outside the 2xx range.
    #[error("UNCACHEABLE: status {0}")]
    Uncacheable(u16),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Upstream fetch timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Upstream response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network-level failure talking to the upstream.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Precaching failed during install.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle event not valid in the current state.
    #[error("INVALID_TRANSITION: {event} while {state}")]
    InvalidTransition { state: String, event: String },
}

impl Error {
    /// Whether the error came from talking to the upstream rather than from
    /// the cache registry.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::HttpError(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Uncacheable(404);
        assert!(err.to_string().contains("UNCACHEABLE"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_transition_display() {
        let err = Error::InvalidTransition { state: "activated".into(), event: "install".into() };
        assert_eq!(err.to_string(), "INVALID_TRANSITION: install while activated");
    }

    #[test]
    fn test_is_network() {
        assert!(Error::HttpError("connection refused".into()).is_network());
        assert!(Error::FetchTimeout("20s".into()).is_network());
        assert!(!Error::CorruptEntry("bad headers".into()).is_network());
        assert!(!Error::Uncacheable(500).is_network());
    }
}
