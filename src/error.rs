use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    services::generator::GeneratorError,
    state::{
        connections::ConnectionsError, feud::FeudError, jeopardy::JeopardyError,
        phase::InvalidTransition,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Credentials or token were rejected.
    #[error("{0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("{0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("{0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// Content generation failed or is not available.
    #[error("{0}")]
    Generation(String),
    /// A required integration is not configured on this server.
    #[error("{0}")]
    NotConfigured(String),
    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::InvalidInput(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<JeopardyError> for ServiceError {
    fn from(err: JeopardyError) -> Self {
        match err {
            JeopardyError::UnknownClue { .. } => ServiceError::NotFound(err.to_string()),
            JeopardyError::EmptyAnswer | JeopardyError::InvalidBoard(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
            JeopardyError::AlreadyAnswered { .. } | JeopardyError::NoOpenClue => {
                ServiceError::InvalidState(err.to_string())
            }
            JeopardyError::Phase(invalid) => invalid.into(),
        }
    }
}

impl From<FeudError> for ServiceError {
    fn from(err: FeudError) -> Self {
        match err {
            FeudError::EmptyAnswer | FeudError::InvalidRounds(_) => {
                ServiceError::InvalidInput(err.to_string())
            }
            FeudError::Phase(invalid) => invalid.into(),
        }
    }
}

impl From<ConnectionsError> for ServiceError {
    fn from(err: ConnectionsError) -> Self {
        match err {
            ConnectionsError::UnknownTile(_) => ServiceError::NotFound(err.to_string()),
            ConnectionsError::InvalidPuzzle(_) => ServiceError::InvalidInput(err.to_string()),
            ConnectionsError::TileSolved(_)
            | ConnectionsError::SelectionFull { .. }
            | ConnectionsError::IncompleteSelection { .. } => {
                ServiceError::InvalidState(err.to_string())
            }
            ConnectionsError::Phase(invalid) => invalid.into(),
        }
    }
}

impl From<GeneratorError> for ServiceError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Unsupported(message) => ServiceError::NotConfigured(message),
            other => ServiceError::Generation(other.to_string()),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::NotConfigured(message) => AppError::ServiceUnavailable(message),
            ServiceError::Generation(message) | ServiceError::Internal(message) => {
                AppError::Internal(message)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        let mut response = (status, payload).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
