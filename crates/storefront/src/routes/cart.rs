//! Cart route handlers.
//!
//! Every handler loads the ledger from the session, applies at most one
//! mutation, and answers with the resulting cart.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use animix_core::{CartKey, CartLedger, CartLine, ProductId};

use crate::error::Result;
use crate::services::cart::{SessionCart, line_from_product};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Cart contents with derived totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_items: u64,
    pub total_price: Decimal,
}

impl From<&CartLedger> for CartView {
    fn from(ledger: &CartLedger) -> Self {
        Self {
            items: ledger.lines().to_vec(),
            total_items: ledger.total_items(),
            total_price: ledger.total_price(),
        }
    }
}

/// Identifies a line: product plus optional variant.
#[derive(Debug, Deserialize)]
pub struct LineRef {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl LineRef {
    fn key(self) -> CartKey {
        CartKey::new(self.product_id, self.size, self.color)
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    #[serde(flatten)]
    pub line: LineRef,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItem {
    #[serde(flatten)]
    pub line: LineRef,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// `GET /api/cart`
#[instrument(skip(session))]
pub async fn show(session: Session) -> Json<CartView> {
    let cart = SessionCart::load(&session).await;
    Json(CartView::from(cart.ledger()))
}

/// `POST /api/cart/items`
///
/// Price and stock are snapshotted from the catalog, not taken from the
/// request.
#[instrument(skip(state, session, body), fields(product_id = %body.line.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddItem>,
) -> Result<Json<CartView>> {
    let product = CatalogService::new(state.pool(), state.product_cache())
        .get(body.line.product_id)
        .await?;
    let line = line_from_product(&product, body.line.size, body.line.color, body.quantity)?;

    let mut cart = SessionCart::load(&session).await;
    cart.mutate(|ledger| ledger.add(line)).await;
    tracing::debug!(total_items = cart.ledger().total_items(), "Added to cart");

    Ok(Json(CartView::from(cart.ledger())))
}

/// `PATCH /api/cart/items`
///
/// Quantities clamp into `[1, stock]`; an unknown line is left alone.
#[instrument(skip(session, body))]
pub async fn update(session: Session, Json(body): Json<UpdateItem>) -> Json<CartView> {
    let key = body.line.key();
    let mut cart = SessionCart::load(&session).await;
    cart.mutate(|ledger| ledger.update_quantity(&key, body.quantity)).await;
    Json(CartView::from(cart.ledger()))
}

/// `DELETE /api/cart/items`
#[instrument(skip(session, body))]
pub async fn remove(session: Session, Json(body): Json<LineRef>) -> Json<CartView> {
    let key = body.key();
    let mut cart = SessionCart::load(&session).await;
    cart.mutate(|ledger| ledger.remove(&key)).await;
    Json(CartView::from(cart.ledger()))
}

/// `DELETE /api/cart`
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Json<CartView> {
    let mut cart = SessionCart::load(&session).await;
    cart.mutate(CartLedger::clear).await;
    Json(CartView::from(cart.ledger()))
}

/// `GET /api/cart/count`
#[instrument(skip(session))]
pub async fn count(session: Session) -> Json<CartCount> {
    let cart = SessionCart::load(&session).await;
    Json(CartCount {
        count: cart.ledger().total_items(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn line(qty: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(7),
            size: Some("L".to_string()),
            color: None,
            quantity: qty,
            unit_price: Decimal::new(1250, 2),
            stock_ceiling: 4,
            name: "Akatsuki Hoodie".to_string(),
            image: "/img/akatsuki.jpg".to_string(),
        }
    }

    async fn session_with(lines: Vec<CartLine>) -> Session {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut cart = SessionCart::load(&session).await;
        cart.mutate(|ledger| lines.into_iter().for_each(|l| ledger.add(l))).await;
        session
    }

    #[test]
    fn test_add_body_defaults_quantity() {
        let body: AddItem = serde_json::from_str(r#"{"product_id": 7, "size": "L"}"#).unwrap();
        assert_eq!(body.quantity, 1);
        assert_eq!(body.line.color, None);
    }

    #[tokio::test]
    async fn test_update_clamps_instead_of_removing() {
        let session = session_with(vec![line(2)]).await;
        let body: UpdateItem =
            serde_json::from_str(r#"{"product_id": 7, "size": "L", "quantity": 0}"#).unwrap();

        let Json(view) = update(session, Json(body)).await;
        assert_eq!(view.total_items, 1);
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_count() {
        let session = session_with(vec![line(3)]).await;
        let Json(before) = count(session.clone()).await;
        assert_eq!(before.count, 3);

        let body: LineRef = serde_json::from_str(r#"{"product_id": 7, "size": "L"}"#).unwrap();
        let Json(view) = remove(session.clone(), Json(body)).await;
        assert_eq!(view.total_items, 0);
        assert_eq!(view.total_price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_clear_empties_cart() {
        let session = session_with(vec![line(1)]).await;
        let Json(view) = clear(session).await;
        assert!(view.items.is_empty());
    }
}
