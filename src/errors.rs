use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Insufficient balance. Required: {required}, Available: {available}")]
    InsufficientFunds {
        required: BigDecimal,
        available: BigDecimal,
    },
    #[error("Insufficient holdings of {stock_code}. Requested: {requested}, Held: {held}")]
    InsufficientHoldings {
        stock_code: String,
        requested: i64,
        held: i64,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("Could not acquire user lock, try again later")]
    LockTimeout,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shortfall carried by an `InsufficientFunds` error, for logging.
    pub fn shortfall(&self) -> Option<BigDecimal> {
        match self {
            AppError::InsufficientFunds {
                required,
                available,
            } => Some(required - available),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::InsufficientFunds { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AppError::InsufficientHoldings { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            AppError::InvalidStateTransition(msg) => (StatusCode::CONFLICT, msg).into_response(),
            AppError::LockTimeout => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("1"));
                (StatusCode::SERVICE_UNAVAILABLE, headers, self.to_string()).into_response()
            }
            AppError::Db(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}
