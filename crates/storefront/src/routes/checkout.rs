//! Checkout route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use animix_core::{OrderId, ShippingAddress};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::cart::SessionCart;
use crate::services::checkout::{Buyer, CheckoutOutcome, CheckoutPipeline, confirm_return};
use crate::state::AppState;

/// Shipping address as submitted. Missing fields are reported by
/// validation rather than by the JSON extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressInput> for ShippingAddress {
    fn from(input: AddressInput) -> Self {
        Self {
            full_name: input.full_name,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            country: input.country,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    pub shipping_address: AddressInput,
}

/// `POST /api/checkout`
///
/// Creates a pending order from the session cart and returns the hosted
/// payment URL. The cart is not touched.
#[instrument(skip(state, session, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let cart = SessionCart::load(&session).await;
    let buyer = Buyer {
        user_id: user.id,
        email: Some(user.email.to_string()),
    };

    let orders = OrderRepository::new(state.pool());
    let outcome = CheckoutPipeline::new(&orders, state.stripe(), &state.config().base_url)
        .run(&buyer, cart.ledger(), body.shipping_address.into())
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuccessParams {
    pub session_id: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessView {
    pub message: &'static str,
    pub order_id: Option<OrderId>,
}

/// `GET /checkout/success`
///
/// Landing point after the hosted payment page. Clears the cart; a logged-in
/// shopper is recorded on the span.
#[instrument(skip(session, viewer), fields(user_id = ?viewer.as_ref().map(|u| u.id)))]
pub async fn success(
    OptionalAuth(viewer): OptionalAuth,
    session: Session,
    Query(params): Query<SuccessParams>,
) -> Json<SuccessView> {
    let order_id = params.order_id.as_deref().and_then(|raw| raw.parse().ok());

    let mut cart = SessionCart::load(&session).await;
    confirm_return(&mut cart, order_id, params.session_id.as_deref()).await;

    Json(SuccessView {
        message: "Thank you for your order",
        order_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use animix_core::{CartLine, Email, ProductId, Role, UserId};

    use crate::models::CurrentUser;

    use super::*;

    #[test]
    fn test_partial_address_deserializes() {
        let body: CheckoutBody =
            serde_json::from_str(r#"{"shipping_address": {"full_name": "Luffy"}}"#).unwrap();
        let address = ShippingAddress::from(body.shipping_address);
        assert_eq!(address.full_name, "Luffy");
        assert!(address.normalized().is_err());
    }

    #[tokio::test]
    async fn test_success_clears_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut cart = SessionCart::load(&session).await;
        cart.mutate(|ledger| {
            ledger.add(CartLine {
                product_id: ProductId::new(1),
                size: None,
                color: None,
                quantity: 1,
                unit_price: Decimal::new(999, 2),
                stock_ceiling: 2,
                name: "Pin".to_string(),
                image: "/img/pin.jpg".to_string(),
            });
        })
        .await;

        let params = SuccessParams {
            session_id: Some("cs_test_123".to_string()),
            order_id: Some("42".to_string()),
        };
        let Json(view) = success(OptionalAuth(None), session.clone(), Query(params)).await;

        assert_eq!(view.order_id, Some(OrderId::new(42)));
        assert!(SessionCart::load(&session).await.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_success_with_logged_in_viewer_clears_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut cart = SessionCart::load(&session).await;
        cart.mutate(|ledger| {
            ledger.add(CartLine {
                product_id: ProductId::new(2),
                size: Some("M".to_string()),
                color: None,
                quantity: 2,
                unit_price: Decimal::new(1500, 2),
                stock_ceiling: 4,
                name: "Hoodie".to_string(),
                image: "/img/hoodie.jpg".to_string(),
            });
        })
        .await;

        let viewer = CurrentUser {
            id: UserId::new(7),
            name: "Nami".to_string(),
            email: Email::parse("nami@animix.shop").unwrap(),
            role: Role::User,
        };
        let Json(view) = success(
            OptionalAuth(Some(viewer)),
            session.clone(),
            Query(SuccessParams::default()),
        )
        .await;

        assert_eq!(view.order_id, None);
        assert!(SessionCart::load(&session).await.ledger().is_empty());
    }
}
