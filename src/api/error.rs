//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                      | Key Methods         |
// |-----------------|--------------------------------------------------|---------------------|
// | ApiError        | Error types for the HTTP API                     | into_response, from |
//--------------------------------------------------------------------------------------------------

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::dto::ErrorResponse;
use crate::matcher::EngineError;

/// Type alias for Result with ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

/// API-specific error types, each mapped to a status code and a JSON body.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The request was malformed or rejected by validation.
    #[error("{0}")]
    BadRequest(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Something went wrong inside the service.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => Self::BadRequest(format!("Invalid order: {msg}")),
            EngineError::DuplicateOrder(id) => {
                Self::BadRequest(format!("Order {id} already exists"))
            }
            EngineError::InsufficientLiquidity {
                requested,
                available,
            } => Self::BadRequest(format!(
                "Insufficient liquidity: only {available} shares available, requested {requested}"
            )),
            EngineError::OrderNotFound(_) => Self::NotFound("Order not found".to_string()),
            EngineError::AlreadyFilled(_) => {
                Self::BadRequest("Cannot cancel: order already filled".to_string())
            }
        }
    }
}
