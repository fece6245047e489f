use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

/// Raised by a store when a write collides with a unique key.
#[derive(Debug, thiserror::Error)]
#[error("{entity} with this {field} already exists")]
pub struct UniqueViolation {
    pub entity: &'static str,
    pub field: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<UniqueViolation>() {
            Ok(dup) => AppError::Conflict(dup.to_string()),
            Err(err) => AppError::Internal(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

fn envelope(status: StatusCode, message: String, stack: Option<String>) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: ErrorBody { message, stack },
    };
    (status, Json(body)).into_response()
}

/// Debug rendering of an internal failure, attached to the response so
/// [`expose_error_detail`] can surface it in development mode.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Internal(err) => {
                error!(error = ?err, "internal error");
                let mut res = envelope(status, "Internal server error".into(), None);
                res.extensions_mut().insert(ErrorDetail(format!("{err:?}")));
                res
            }
            other => envelope(status, other.to_string(), None),
        }
    }
}

/// Rewrites 500 envelopes to carry the error chain when `APP_ENV=development`.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let detail = res.extensions_mut().remove::<ErrorDetail>();
    match detail {
        Some(ErrorDetail(stack)) if state.config.development => {
            let message = stack.lines().next().unwrap_or("Internal server error").to_string();
            envelope(res.status(), message, Some(stack))
        }
        _ => res,
    }
}
