use thiserror::Error;

/// Top-level error type for the `galleria-api` crate.
///
/// Covers every transport-level failure mode. `galleria-core` maps these
/// into domain errors; UI consumers ultimately see [`Error::detail`].
#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx response from the API. `message` is the server-supplied
    /// `detail` field when present, else an `HTTP <status>` fallback.
    #[error("API error: {message}")]
    Api { message: String, status: u16 },

    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS or client-construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The single user-facing message for this failure.
    ///
    /// For API errors this is the server's `detail` string, which is what
    /// the application surfaces in notifications.
    pub fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 404,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
