use crate::application_port::{AuthError, StreamError};
use crate::domain_port::CatalogError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Body of every error response. Messages are fixed per code so a response
/// never says which check failed.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        MessageBody {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiErrorCode {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing refresh token")]
    MissingRefreshToken,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Refresh token revoked")]
    RevokedRefreshToken,
    #[error("Refresh token expired")]
    ExpiredRefreshToken,
    #[error("Invalid CSRF token")]
    CsrfMismatch,
    #[error("Bad request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Error streaming video")]
    StreamFailure,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        error!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthorized
            | ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidRefreshToken
            | ApiErrorCode::RevokedRefreshToken
            | ApiErrorCode::ExpiredRefreshToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::MissingRefreshToken | ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::CsrfMismatch => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::StreamFailure | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps failures of the access-token gate. Every cause collapses into one
    /// generic 401.
    pub fn from_gate(error: AuthError) -> ApiErrorCode {
        match error {
            AuthError::Store(e) | AuthError::InternalError(e) => ApiErrorCode::internal(e),
            other => {
                debug!("access denied: {}", other);
                ApiErrorCode::Unauthorized
            }
        }
    }
}

impl reject::Reject for ApiErrorCode {}

/// Mapping for the login, refresh and logout endpoints.
impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::MissingToken => ApiErrorCode::MissingRefreshToken,
            AuthError::InvalidToken => ApiErrorCode::InvalidRefreshToken,
            AuthError::ExpiredToken => ApiErrorCode::ExpiredRefreshToken,
            AuthError::RevokedToken => ApiErrorCode::RevokedRefreshToken,
            AuthError::CsrfMismatch => ApiErrorCode::CsrfMismatch,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<CatalogError> for ApiErrorCode {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound => ApiErrorCode::NotFound,
            CatalogError::Io(e) => {
                warn!("media lookup failed: {}", e);
                ApiErrorCode::StreamFailure
            }
        }
    }
}

impl From<StreamError> for ApiErrorCode {
    fn from(error: StreamError) -> Self {
        warn!(bytes_sent = error.bytes_sent(), "media stream failed: {}", error);
        ApiErrorCode::StreamFailure
    }
}

pub fn error_reply(code: ApiErrorCode) -> warp::reply::WithStatus<warp::reply::Json> {
    let json = warp::reply::json(&MessageBody::new(code.to_string()));
    warp::reply::with_status(json, code.status())
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(code) = err.find::<ApiErrorCode>() {
        return Ok(error_reply(*code));
    }

    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (StatusCode::BAD_REQUEST, "Bad request")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Length required")
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };

    let json = warp::reply::json(&MessageBody::new(message));
    Ok(warp::reply::with_status(json, status))
}
