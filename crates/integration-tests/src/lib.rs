//! Integration test support for the Animix storefront.
//!
//! In-memory stand-ins for the order store and the payment gateway, plus
//! builders for carts and products, so the order pipeline can be driven end
//! to end without `PostgreSQL` or Stripe.
//!
//! # Running Tests
//!
//! ```bash
//! # Ledger and pipeline tests (no services needed)
//! cargo test -p animix-integration-tests
//!
//! # HTTP tests against a running server
//! cargo test -p animix-integration-tests -- --ignored
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;
use tower_sessions::{MemoryStore, Session};

use animix_core::{
    CartLine, Order, OrderDraft, OrderId, Product, ProductCategory, ProductId, ShippingAddress,
};
use animix_storefront::db::RepositoryError;
use animix_storefront::payments::{PaymentError, PaymentGateway, PaymentSession, SessionRequest};
use animix_storefront::services::checkout::OrderStore;

/// Order store backed by a vector. Ids are assigned from 1.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<Vec<Order>>,
    failing: bool,
}

impl MemoryOrderStore {
    /// A store whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    #[must_use]
    pub fn find(&self, id: OrderId) -> Option<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }
}

impl OrderStore for MemoryOrderStore {
    async fn create_order(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        if self.failing {
            return Err(RepositoryError::DataCorruption("store offline".to_string()));
        }
        let mut orders = self.orders.lock().unwrap();
        let id = OrderId::new(i32::try_from(orders.len()).unwrap() + 1);
        let order = Order::from_draft(id, draft.clone(), Utc::now());
        orders.push(order.clone());
        Ok(order)
    }
}

/// Payment gateway that records every request.
#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<SessionRequest>>,
    failing: bool,
}

impl FakeGateway {
    /// A gateway that rejects every session.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        if self.failing {
            return Err(PaymentError::Api {
                status: 503,
                message: "api_error: try again later".to_string(),
            });
        }
        let session_id = format!("cs_test_{}", requests.len());
        Ok(PaymentSession {
            redirect_url: format!("https://checkout.stripe.com/c/pay/{session_id}"),
            session_id,
        })
    }
}

/// A fresh in-memory session.
#[must_use]
pub fn memory_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

/// Parse a decimal literal.
#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// A catalog product with sizes, colors, and the given price and stock.
#[must_use]
pub fn product(id: i32, price: &str, stock: i32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        description: "Screen printed".to_string(),
        price: dec(price),
        images: vec![format!("https://cdn.animix.shop/p{id}.jpg")],
        category: ProductCategory::TShirt,
        anime: "Jujutsu Kaisen".to_string(),
        sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
        colors: vec!["Black".to_string(), "White".to_string()],
        stock,
        featured: false,
        tags: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// A cart line with the given variant, quantity, price, and stock ceiling.
#[must_use]
pub fn line(
    product_id: i32,
    size: Option<&str>,
    color: Option<&str>,
    quantity: u32,
    unit_price: &str,
    stock_ceiling: u32,
) -> CartLine {
    CartLine {
        product_id: ProductId::new(product_id),
        size: size.map(String::from),
        color: color.map(String::from),
        quantity,
        unit_price: dec(unit_price),
        stock_ceiling,
        name: format!("Product {product_id}"),
        image: format!("https://cdn.animix.shop/p{product_id}.jpg"),
    }
}

/// A complete shipping address.
#[must_use]
pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Yuji Itadori".to_string(),
        address: "1 Jujutsu High".to_string(),
        city: "Tokyo".to_string(),
        postal_code: "100-0001".to_string(),
        country: "Japan".to_string(),
    }
}
