//! Error types for the alert client.

use thiserror::Error;

/// Errors that can occur while building, sending or interpreting an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The request could not be sent or its response body could not be read.
    #[error("request {url} err: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-zero status code and a message.
    #[error("sinawatch request error: {message}")]
    Rejected { code: i64, message: String },

    /// The response `code` field is missing or not an integer.
    #[error("invalid status code in response: {0}")]
    InvalidStatusCode(String),

    /// The configured host/port/path do not form a valid URL.
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A header value contains characters HTTP does not allow.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The signing key could not be used.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Missing or malformed configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A notifier with this name is already registered.
    #[error("notifier registered twice: {0}")]
    DuplicateNotifier(String),

    /// No notifier is registered under this name.
    #[error("unknown notifier {0:?}")]
    UnknownNotifier(String),

    /// A background send task failed to complete.
    #[error("send task failed: {0}")]
    Task(String),
}
