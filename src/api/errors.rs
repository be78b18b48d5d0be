use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::attempt_error::{AttemptError, ALREADY_SUBMITTED};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    kind: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    AlreadySubmitted,
    TooManyRequests(&'static str),
    Store(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::AlreadySubmitted => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error class for clients.
    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) | Self::Forbidden(_) => "unauthorized",
            Self::BadRequest(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "invalid_state",
            Self::AlreadySubmitted => "already_submitted",
            Self::TooManyRequests(_) => "rate_limited",
            Self::Store(_) => "store",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Unauthorized(message) => Self::Forbidden(message),
            AttemptError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            AttemptError::InvalidState(message) => Self::Conflict(message),
            AttemptError::AlreadySubmitted(_) => Self::AlreadySubmitted,
            AttemptError::Validation(message) => Self::BadRequest(message),
            AttemptError::Store(err) => {
                tracing::error!(error = %err, "Attempt store failure");
                Self::Store("Storage is temporarily unavailable".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let detail = match self {
            ApiError::Unauthorized(message) | ApiError::TooManyRequests(message) => {
                message.to_string()
            }
            ApiError::AlreadySubmitted => ALREADY_SUBMITTED.to_string(),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
            ApiError::Forbidden(message)
            | ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Store(message) => message,
        };

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), kind, detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::StoreError;
    use crate::services::attempt_error::TIME_IS_UP;
    use crate::test_support::read_json;

    #[tokio::test]
    async fn attempt_errors_map_to_stable_kinds() {
        let cases = [
            (AttemptError::Unauthorized("no".to_string()), StatusCode::FORBIDDEN, "unauthorized"),
            (AttemptError::NotFound("Attempt"), StatusCode::NOT_FOUND, "not_found"),
            (AttemptError::time_is_up(), StatusCode::CONFLICT, "invalid_state"),
            (AttemptError::Validation("bad".to_string()), StatusCode::BAD_REQUEST, "validation_error"),
            (
                AttemptError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "store",
            ),
        ];

        for (err, status, kind) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
            let body = read_json(response).await;
            assert_eq!(body["kind"], kind);
            assert_eq!(body["status"], status.as_u16());
        }
    }

    #[tokio::test]
    async fn time_is_up_detail_is_preserved() {
        let response = ApiError::from(AttemptError::time_is_up()).into_response();
        let body = read_json(response).await;
        assert_eq!(body["detail"], TIME_IS_UP);
    }

    #[test]
    fn unauthorized_sets_bearer_challenge() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }
}
