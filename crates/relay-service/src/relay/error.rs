//! Local relay failures.
//!
//! Every variant is answered with the same fixed 500. Upstream non-2xx
//! statuses are not errors here; they are relayed as-is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay target: {0}")]
    InvalidTarget(#[from] url::ParseError),

    #[error("upstream timeout: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream connection error: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("failed to read upstream body: {0}")]
    ReadBody(#[source] reqwest::Error),
}

impl RelayError {
    /// Classify an error returned by `RequestBuilder::send`.
    pub fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(e)
        } else {
            RelayError::Connect(e)
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "relay error").into_response()
    }
}
