//! HTTP error type.
//!
//! Every handler returns [`ApiResult`]. Failures render as
//! `{"success": false, "error": "..."}`; server-side failures are logged and
//! replaced with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::aggregates::{
    AddressError, CartError, CustomerError, OrderError, ProductError, SellerError, ShopError, SubscriptionError,
};
use crate::cart::CartServiceError;
use crate::domain::value_objects::ContactError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error("Database schema is out of date; run the pending migrations")]
    SchemaOutdated(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::SchemaOutdated(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized() -> Self { Self::Unauthorized("Unauthorized".into()) }
    pub fn forbidden() -> Self { Self::Forbidden("Forbidden".into()) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request error");
                "Internal server error".to_string()
            }
            Self::SchemaOutdated(detail) => {
                tracing::error!(error = %detail, "Database schema mismatch");
                self.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::Duplicate(msg) => Self::BadRequest(msg),
            StoreError::MissingReference(msg) => Self::BadRequest(msg),
            StoreError::InsufficientInventory(_) => Self::Conflict(err.to_string()),
            StoreError::Address(e) => e.into(),
            StoreError::Shop(e) => e.into(),
            StoreError::Subscription(e) => e.into(),
            StoreError::SchemaMismatch(detail) => Self::SchemaOutdated(detail),
            StoreError::Corrupt(_) | StoreError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { Self::BadRequest(format!("Invalid JSON body: {}", rejection.body_text())) }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self { Self::BadRequest(format!("Invalid path: {}", rejection.body_text())) }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self { Self::BadRequest(format!("Invalid query: {}", rejection.body_text())) }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
        fields.sort_unstable();
        Self::BadRequest(format!("Invalid fields: {}", fields.join(", ")))
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<AddressError> for ApiError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::NotFound => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::NotFound => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::NotFound | SubscriptionError::PlanNotFound => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<SellerError> for ApiError {
    fn from(err: SellerError) -> Self {
        match err {
            SellerError::NotFound => Self::NotFound(err.to_string()),
            SellerError::PasswordHash => Self::Internal(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<CustomerError> for ApiError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::NotFound => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound | ProductError::ShopNotFound => Self::NotFound(err.to_string()),
            ProductError::NoActiveSubscription | ProductError::QuotaReached(_) => Self::Forbidden(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => Self::NotFound(err.to_string()),
            OrderError::InsufficientInventory(_) => Self::Conflict(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound | CartError::ProductNotFound => Self::NotFound(err.to_string()),
            CartError::InvalidQuantity => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<CartServiceError> for ApiError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::Cart(e) => e.into(),
            CartServiceError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_store_error_status_mapping() {
        assert_eq!(ApiError::from(StoreError::NotFound("Order")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(StoreError::Duplicate("dup".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(StoreError::InsufficientInventory(Uuid::nil())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(StoreError::Corrupt("bad".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::from(StoreError::Shop(ShopError::DefaultRequired)).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_domain_error_status_mapping() {
        assert_eq!(ApiError::from(ProductError::QuotaReached(5)).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(OrderError::EmptyCart).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(SubscriptionError::PlanNotFound).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal server error");

        let response = ApiError::from(StoreError::SchemaMismatch("relation \"shops\" does not exist".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Database schema is out of date; run the pending migrations");
    }
}
