// ABOUTME: Custom error types for API communication
// ABOUTME: Distinguishes transport failures from HTTP errors carrying server-provided detail

use std::fmt;

/// Substituted when a non-2xx response body cannot be parsed for a `detail`
/// message. The backend localizes its own messages, so this matches them.
pub const GENERIC_REQUEST_FAILURE: &str = "Erro na requisição";

#[derive(Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, DNS, timeout).
    Transport(reqwest::Error),
    /// Non-success HTTP status; `detail` is the server's error message when
    /// the body carried one, otherwise [`GENERIC_REQUEST_FAILURE`].
    Http { status: u16, detail: String },
    /// A 2xx response whose body did not match the expected shape.
    Decode(reqwest::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "Request error: {}", err),
            ApiError::Http { status, detail } => write!(f, "HTTP {}: {}", status, detail),
            ApiError::Decode(err) => write!(f, "Invalid response body: {}", err),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Transport(err) | ApiError::Decode(err) => Some(err),
            ApiError::Http { .. } => None,
        }
    }
}
