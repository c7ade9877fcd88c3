//! HTTP handlers for the catalog routes.
//!
//! Every response uses the same JSON envelope: `{ "status", "message", "data" }`
//! on success and `{ "status": "error", "message" }` on failure. `CatalogError`
//! maps onto status codes here and nowhere else.

pub mod brands;
pub mod categories;
pub mod health;
pub mod products;
pub mod sub_categories;
pub mod upload;

use crate::catalog::CatalogError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    pub status: String,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

pub(crate) fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = Envelope {
        status: STATUS_SUCCESS.to_string(),
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

pub(crate) fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        status: STATUS_ERROR.to_string(),
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => failure(StatusCode::NOT_FOUND, message),
            Self::Validation(message) => failure(StatusCode::BAD_REQUEST, message),
            Self::Upload(_) | Self::Storage(_) => {
                warn!("object store failure: {self}");
                failure(StatusCode::BAD_GATEWAY, self.to_string())
            }
            Self::Store(err) => {
                error!("store failure: {err}");
                failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{objects::ObjectStoreError, store::StoreError};

    #[test]
    fn error_kinds_map_to_status_codes() {
        let cases = [
            (CatalogError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (CatalogError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                CatalogError::Upload(ObjectStoreError::Timeout),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CatalogError::Storage(ObjectStoreError::Timeout),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CatalogError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
