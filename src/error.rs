use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{MediaFormat, Source};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unsupported platform")]
    UnsupportedPlatform,

    #[error("This link does not look like a {expected} link (detected {detected})")]
    MismatchedLink { expected: Source, detected: Source },

    #[error("{0}")]
    InvalidUrl(String),

    #[error("No suitable {0} format found")]
    NoFormatAvailable(MediaFormat),

    #[error("{0}")]
    UpstreamResolutionFailed(String),

    #[error("{0}")]
    UpstreamUnreachable(String),

    #[error("{0} not implemented yet")]
    NotImplemented(Source),
}

impl ResolveError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl(message.into())
    }

    pub fn upstream_failed(message: impl Into<String>) -> Self {
        Self::UpstreamResolutionFailed(message.into())
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::UpstreamUnreachable(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedPlatform
            | Self::MismatchedLink { .. }
            | Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Self::NoFormatAvailable(_)
            | Self::UpstreamResolutionFailed(_)
            | Self::UpstreamUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });

        (self.status(), body).into_response()
    }
}
