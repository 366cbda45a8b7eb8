//! Admin route handlers: catalog management, order management, dashboard.
//!
//! Every handler takes [`RequireAdmin`], so non-admins get 403 before any
//! work is done.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use animix_core::{Order, OrderId, OrderStatus, PaymentResult, Product, ProductId, ProductInput};

use crate::db::OrderFilter;
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderService;
use crate::state::AppState;

use super::orders::OrderParams;
use super::parse_id;

/// Store-wide counters.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_products: i64,
    pub total_orders: i64,
    /// Sum over every order, paid or not.
    pub total_revenue: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaidBody {
    #[serde(default)]
    pub payment_result: Option<PaymentResult>,
}

/// `GET /api/admin/dashboard`
#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Dashboard>> {
    let total_products = CatalogService::new(state.pool(), state.product_cache())
        .count_all()
        .await?;
    let totals = OrderService::new(state.pool()).totals().await?;

    Ok(Json(Dashboard {
        total_products,
        total_orders: totals.count,
        total_revenue: totals.revenue,
    }))
}

/// `POST /api/admin/products`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.0.id))]
pub async fn create_product(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = CatalogService::new(state.pool(), state.product_cache())
        .create(input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.0.id))]
pub async fn update_product(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let id: ProductId = parse_id(&id, "product")?;
    let product = CatalogService::new(state.pool(), state.product_cache())
        .update(id, input)
        .await?;
    Ok(Json(product))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id: ProductId = parse_id(&id, "product")?;
    CatalogService::new(state.pool(), state.product_cache())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/orders`
#[instrument(skip(state, _admin))]
pub async fn orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<OrderParams>,
) -> Result<Json<Vec<Order>>> {
    let filter = OrderFilter {
        user_id: None,
        status: params.status()?,
    };
    let orders = OrderRepository::new(state.pool()).list(filter).await?;
    Ok(Json(orders))
}

/// `PATCH /api/admin/orders/{id}/status`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_id(&id, "order")?;
    let next: OrderStatus = body.status.trim().parse().map_err(AppError::Validation)?;
    let order = OrderService::new(state.pool())
        .advance_status(id, next)
        .await?;
    Ok(Json(order))
}

/// `POST /api/admin/orders/{id}/paid`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.id))]
pub async fn mark_order_paid(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    body: Option<Json<PaidBody>>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_id(&id, "order")?;
    let payment_result = body.and_then(|Json(b)| b.payment_result);
    let order = OrderService::new(state.pool())
        .mark_paid(id, payment_result)
        .await?;
    Ok(Json(order))
}
