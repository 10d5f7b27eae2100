use actix_web::error::{BlockingError, JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use err_derive::Error;
use log::*;
use serde::Serialize;

use crate::auth::AuthError;
use crate::menu::validation::ValidationError;
use crate::persistence::StoreError;

/// Everything a request can fail with. Each variant renders as the same
/// `{success, error, message}` envelope; only the status and message vary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(display = "{}", _0)]
    Invalid(#[error(source)] #[error(from)] ValidationError),
    #[error(display = "bad request")]
    BadRequest,
    #[error(display = "{}", _0)]
    Auth(#[error(source)] #[error(from)] AuthError),
    #[error(display = "resource not found")]
    NotFound,
    #[error(display = "{}", _0)]
    Conflict(String),
    #[error(display = "unprocessable")]
    Unprocessable(#[error(source, no_from)] StoreError),
    #[error(display = "internal server error")]
    Internal(String),
}

#[derive(Serialize, Debug)]
struct Envelope {
    success: bool,
    error: u16,
    message: String,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            e @ StoreError::Conflict(_) => ApiError::Conflict(e.to_string()),
            e => ApiError::Unprocessable(e),
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Invalid(_) | ApiError::BadRequest | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(e) => e.status(),
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ApiError::Unprocessable(e) => warn!("Unprocessable: {}: {:?}", e, e),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
            e => debug!("Rejecting with {}: {}", status, e),
        }

        HttpResponse::build(status).json(Envelope {
            success: false,
            error: status.as_u16(),
            message: self.to_string(),
        })
    }
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}

pub fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Unreadable body for {}: {}", req.uri(), err);
    ApiError::BadRequest.into()
}

pub fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    debug!("Unmatched path {}: {}", req.uri(), err);
    ApiError::NotFound.into()
}
