//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products                  - Product listing (filters, sort, pagination)
//! GET    /api/products/{id}             - Product detail
//!
//! # Cart (session-backed)
//! GET    /api/cart                      - Lines and totals
//! POST   /api/cart/items                - Add line
//! PATCH  /api/cart/items                - Update quantity
//! DELETE /api/cart/items                - Remove line
//! DELETE /api/cart                      - Clear
//! GET    /api/cart/count                - Item count
//!
//! # Checkout
//! POST   /api/checkout                  - Create order and payment session (auth)
//! GET    /checkout/success              - Return from payment page, clears cart
//!
//! # Orders (auth)
//! GET    /api/orders                    - Own orders, or all for admin
//! GET    /api/orders/{id}               - Single order
//!
//! # Auth
//! POST   /api/auth/register             - Create account (rate limited)
//! POST   /api/auth/login                - Log in (rate limited)
//! POST   /api/auth/logout               - Log out
//! GET    /api/auth/me                   - Current identity
//!
//! # Admin (admin role)
//! GET    /api/admin/dashboard           - Counts and revenue
//! POST   /api/admin/products            - Create product
//! PUT    /api/admin/products/{id}       - Update product
//! DELETE /api/admin/products/{id}       - Delete product
//! GET    /api/admin/orders              - All orders
//! PATCH  /api/admin/orders/{id}/status  - Advance status
//! POST   /api/admin/orders/{id}/paid    - Mark paid
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use std::str::FromStr;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Parse a path id, answering 404 for anything that isn't one.
fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("No {what} with id {raw}")))
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route(
            "/items",
            post(cart::add).patch(cart::update).delete(cart::remove),
        )
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", patch(admin::update_order_status))
        .route("/orders/{id}/paid", post(admin::mark_order_paid))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::create))
        .route("/checkout/success", get(checkout::success))
        .nest("/api/orders", order_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/admin", admin_routes())
}
