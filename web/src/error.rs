//! HTTP mapping of domain and authentication errors.
//!
//! Handlers return `Result<_, AppError>`; every [`TicketError`] and
//! [`AuthError`] converts into one with `?`.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helpdesk_auth::AuthError;
use helpdesk_core::{ErrorKind, TicketError};
use serde::Serialize;
use std::fmt;

/// Error returned by every handler.
///
/// # Examples
///
/// ```ignore
/// async fn handler(actor: CurrentActor) -> Result<Json<TicketOut>, AppError> {
///     let ticket = state.registry.get(&actor, id).await?;
///     Ok(Json(view.into()))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// User-facing message
    message: String,
    /// Machine-readable code
    code: &'static str,
    /// Internal cause, logged but never sent
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create an error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach an internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 422 Unprocessable Entity.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// 500 Internal Server Error. The message is generic; details go to the log.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            message,
        )
    }

    /// Status code of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code of this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TicketError> for AppError {
    fn from(error: TicketError) -> Self {
        let message = error.to_string();
        match error.kind() {
            ErrorKind::NotFound => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
            ErrorKind::Forbidden => Self::forbidden(message),
            ErrorKind::InvalidTransition => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_TRANSITION", message)
            }
            ErrorKind::Conflict => Self::new(StatusCode::CONFLICT, "CONFLICT", message),
            ErrorKind::Validation => Self::validation(message),
            ErrorKind::PayloadTooLarge => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", message)
            }
            ErrorKind::DisallowedFileType => Self::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "DISALLOWED_FILE_TYPE",
                message,
            ),
            ErrorKind::Internal => Self::internal("An internal error occurred")
                .with_source(anyhow::Error::new(error)),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        if error.is_client_error() {
            if error.is_security_issue() {
                tracing::warn!(error = %error, "Rejected forged credential");
            }
            Self::unauthorized(error.to_string())
        } else {
            Self::internal("An internal error occurred").with_source(anyhow::Error::new(error))
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> Self {
        let status = error.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(status, "PAYLOAD_TOO_LARGE", error.body_text())
        } else {
            Self::bad_request(error.body_text())
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
