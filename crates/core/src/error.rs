//! Unified error types for the caching engine.
//!
//! One variant per failure class in the error taxonomy: storage failures are
//! always recoverable for callers, network failures trigger strategy
//! fallback, install failures abort generation promotion, activation
//! failures are logged and skipped per namespace.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by all engine components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache read/write failure (quota, corruption, closed connection).
    ///
    /// Non-fatal by contract: callers proceed with the network response or
    /// whatever is available.
    #[error("STORAGE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Transport-level fetch failure (connection refused, DNS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The upstream answered with a non-success status where a success was
    /// required (precache manifest entries).
    #[error("HTTP_STATUS: {url} returned {status}")]
    HttpStatus { url: String, status: u16 },

    /// Request URL could not be parsed or normalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A precache manifest entry failed; the install attempt is aborted and
    /// the new generation is not promoted.
    #[error("INSTALL_FAILED: {0}")]
    Install(String),

    /// Failure during old-generation cleanup or client claiming.
    #[error("ACTIVATION_ERROR: {0}")]
    Activation(String),

    /// The worker message channel is gone (worker shut down).
    #[error("CHANNEL_CLOSED: {0}")]
    ChannelClosed(String),

    /// Invalid input (malformed manifest, bad host event).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Network("connection reset".to_string());
        assert!(err.to_string().contains("NETWORK_ERROR"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_http_status_display() {
        let err = Error::HttpStatus { url: "https://example.com/app.css".into(), status: 404 };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("app.css"));
    }
}
