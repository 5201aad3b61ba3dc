use std::convert::Infallible;

use thiserror::Error;
use warp::{
    http::StatusCode,
    reject::{Reject, Rejection},
    Reply,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Client-facing error kinds. Every database action and handler funnels
/// into this type; the `recover` handler at the end of the filter chain
/// renders it as `{"errors": "..."}` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("shopping cart is empty")]
    EmptyCart,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(info: &str) -> Self {
        Self::Validation(info.to_string())
    }

    pub fn not_found(info: &str) -> Self {
        Self::NotFound(info.to_string())
    }

    pub fn conflict(info: &str) -> Self {
        Self::Conflict(info.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Duplicate toggles answer 400, not 409; clients treat
            // every pre-mutation rejection as a bad request.
            Self::Validation(_) | Self::Conflict(_) | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn reject(self) -> Rejection {
        warp::reject::custom(self)
    }
}

impl Reject for ApiError {}

/// Unique-constraint violation, SQLSTATE class 23.
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => {
                Self::NotFound("no row matches the specified id".to_string())
            }
            sqlx::Error::Database(e) => {
                if e.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    Self::Conflict(e.message().to_string())
                } else {
                    Self::Database(e.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut => Self::Database("pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Database("pool closed".to_string()),
            sqlx::Error::ColumnNotFound(e) => Self::Database(format!("column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::Database(format!("column decode {index} ({source})"))
            }
            e => Self::Database(format!("{e}")),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(format!("{value}"))
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    errors: String,
}

/// Terminal `recover` handler for the whole route tree.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(api) = err.find::<ApiError>() {
        if api.status() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {api}");
            (api.status(), "internal server error".to_string())
        } else {
            (api.status(), api.to_string())
        }
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "resource not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "invalid query string".to_string())
    } else {
        log::error!("unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    let body = warp::reply::json(&ErrorBody { errors: message });
    Ok(warp::reply::with_status(body, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_validation_render_as_bad_request() {
        assert_eq!(
            ApiError::conflict("already in favorites").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::validation("no tags").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmptyCart.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn empty_cart_message_is_specific() {
        assert_eq!(ApiError::EmptyCart.to_string(), "shopping cart is empty");
    }
}
