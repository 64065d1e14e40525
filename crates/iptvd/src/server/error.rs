//! HTTP error mapping.
//!
//! Every error response has the body `{"detail": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use iptv_protocol::{ErrorBody, QueryError};

use crate::state::StateError;

/// Errors returned by route handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 404: the route is disabled.
    #[error("Not found")]
    NotFound,

    /// 409: the request conflicts with backend state.
    #[error("{0}")]
    Conflict(String),

    /// 422: the request body or query failed validation.
    #[error("{0}")]
    Validation(String),

    /// 503: the state actor is gone.
    #[error("backend state unavailable")]
    Unavailable,

    /// 500
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotLoggedIn | StateError::AlreadyRefreshing => {
                Self::Conflict(err.to_string())
            }
            StateError::InvalidCredentials(_) => Self::Validation(err.to_string()),
            StateError::ChannelClosed => Self::Unavailable,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
