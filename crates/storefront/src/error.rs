//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::payments::PaymentError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflicting state (duplicate email, concurrent edit).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Store operation failed.
    #[error("Database error: {0}")]
    Persistence(RepositoryError),

    /// Payment gateway call failed.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(#[from] PaymentError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::PaymentGateway(_) | Self::Internal(_)
        )
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please slow down".to_string(),
            // Don't expose internal error details to clients
            Self::Persistence(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::PaymentGateway(_) => "Payment service error, please try again".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(json!({ "error": self.client_message() }))).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Not found".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Persistence(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                Self::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::UserAlreadyExists => {
                Self::Conflict("An account with this email already exists".to_string())
            }
            AuthError::WeakPassword(msg) => Self::Validation(msg),
            AuthError::InvalidEmail(e) => Self::Validation(format!("Invalid email address: {e}")),
            AuthError::MissingName => Self::Validation("Please provide your name".to_string()),
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::NotFound("Product not found".to_string()),
            CatalogError::Invalid(e) => Self::Validation(e.to_string()),
            CatalogError::Repository(e) => e.into(),
        }
    }
}

impl From<OrderServiceError> for AppError {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::NotFound => Self::NotFound("Order not found".to_string()),
            OrderServiceError::Forbidden => {
                Self::Forbidden("Not authorized to view this order".to_string())
            }
            OrderServiceError::Invalid(e) => Self::Validation(e.to_string()),
            OrderServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Invalid(e) => Self::Validation(e.to_string()),
            CheckoutError::Pricing(e) => Self::Validation(e.to_string()),
            CheckoutError::Persistence(e) => Self::Persistence(e),
            CheckoutError::Payment(e) => Self::PaymentGateway(e),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
