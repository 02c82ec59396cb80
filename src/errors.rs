use crate::models::HabitRef;
use axum::http::StatusCode;

/// Error returned by the reference server's handlers.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failure talking to the habit API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("network failure: {0}")]
    Network(String),
    /// Non-2xx status; `message` is the response body text.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    /// Refused locally before any request was sent.
    #[error("{0}")]
    Validation(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Why a dashboard mutation was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("a change to {0} is still being saved")]
    InFlight(HabitRef),
    #[error("no habit at {0}")]
    NotFound(HabitRef),
    #[error("cancelled by user")]
    Cancelled,
    #[error(transparent)]
    Client(#[from] ClientError),
}
