//! Payment gateway integration.
//!
//! The storefront hands the shopper to a hosted checkout page and never sees
//! card details. [`PaymentGateway`] is the seam the order pipeline depends
//! on; [`StripeClient`] is the production implementation.

mod stripe;

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use animix_core::{CurrencyCode, OrderId, UserId};

pub use stripe::StripeClient;

/// Placeholder the gateway substitutes with the real session id in the
/// success URL.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway rejected the request.
    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Gateway response could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Session was created without a redirect URL.
    #[error("session {0} has no redirect URL")]
    MissingRedirect(String),
}

/// One line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayLineItem {
    pub name: String,
    pub description: String,
    /// Absolute image URL; relative catalog paths are omitted.
    pub image: Option<String>,
    /// Unit price in minor currency units (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

/// A request for a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub line_items: Vec<GatewayLineItem>,
    pub currency: CurrencyCode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub order_id: OrderId,
    pub user_id: UserId,
}

/// A created payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSession {
    pub session_id: String,
    /// Where to send the shopper to pay.
    pub redirect_url: String,
}

/// A hosted-checkout payment provider.
pub trait PaymentGateway: Send + Sync {
    /// Create a payment session for an already persisted order.
    fn create_session(
        &self,
        request: &SessionRequest,
    ) -> impl Future<Output = Result<PaymentSession, PaymentError>> + Send;
}
