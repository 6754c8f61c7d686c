//! HTTP error mapping.
//!
//! # Invariants
//! - Every failure leaves the server as a JSON body `{"error": message}`.
//! - Internal failures are logged in full and reported without details.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookshelf_core::{RepoError, ServiceError};
use log::error;
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized,
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message) | Self::BadRequest(message) | Self::Conflict(message) => {
                write!(f, "{message}")
            }
            Self::Unauthorized => write!(f, "missing or invalid bearer token"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::MismatchedId { .. } => Self::BadRequest(value.to_string()),
            ServiceError::NotFound { .. } => Self::NotFound(value.to_string()),
            ServiceError::Validation(_) | ServiceError::Filter(_) => {
                Self::BadRequest(value.to_string())
            }
            ServiceError::Conflict { .. } => Self::Conflict(value.to_string()),
            ServiceError::Repo(_) | ServiceError::InconsistentState(_) => {
                Self::Internal(value.to_string())
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(details) => {
                error!("event=http_error module=api status=error http_status={} error={details}", status.as_u16());
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if matches!(self, Self::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
