// HTTP error mapping - SkylineError to status codes and JSON bodies
use crate::domain::error::{FetchError, SkylineError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error(transparent)]
    Skyline(#[from] SkylineError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Skyline(err) => match err {
                SkylineError::MissingSeries { .. } => StatusCode::NOT_FOUND,
                SkylineError::InvalidYear { .. } | SkylineError::InvalidYearRange { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SkylineError::Fetch(FetchError::Unauthorized) => StatusCode::UNAUTHORIZED,
                SkylineError::Fetch(FetchError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
                SkylineError::Fetch(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Skyline(err) => match err {
                SkylineError::MissingSeries { .. } => "NOT_IMPORTED",
                SkylineError::MisalignedSeries { .. } => "MISALIGNED_SERIES",
                SkylineError::EmptySequence => "EMPTY_SEQUENCE",
                SkylineError::InvalidRange { .. } => "INVALID_RANGE",
                SkylineError::MalformedSequence(_) => "MALFORMED_SEQUENCE",
                SkylineError::GeometryBuildFailed { .. } => "GEOMETRY_BUILD_FAILED",
                SkylineError::Fetch(FetchError::Unauthorized) => "UPSTREAM_UNAUTHORIZED",
                SkylineError::Fetch(FetchError::RateLimited) => "RATE_LIMITED",
                SkylineError::Fetch(_) => "UPSTREAM_ERROR",
                SkylineError::InvalidYear { .. } => "INVALID_YEAR",
                SkylineError::InvalidYearRange { .. } => "INVALID_YEAR_RANGE",
                SkylineError::Storage(_) => "STORAGE_ERROR",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ApiError::new(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
