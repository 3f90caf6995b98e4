//! Timetable feed error types.

use std::fmt;

/// Errors from fetching the remote timetable.
///
/// Any of these aborts the current refresh before the snapshot store is
/// touched.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// Session was rejected by the feed
    Unauthorized,

    /// Feed returned an error status code
    Api { status: u16, message: String },

    /// Response body was not a list of class records
    Json {
        message: String,
        body: Option<String>,
    },

    /// Local feed file could not be read
    Io { path: String, message: String },

    /// Feed or session not configured
    NotConfigured(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {e}"),
            FetchError::Unauthorized => {
                write!(f, "unauthorized: session rejected by timetable feed")
            }
            FetchError::Api { status, message } => write!(f, "feed error {status}: {message}"),
            FetchError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FetchError::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            FetchError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}
