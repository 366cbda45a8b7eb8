//! Order route handlers for shoppers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use animix_core::{Order, OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::orders::OrderService;
use crate::state::AppState;

use super::parse_id;

#[derive(Debug, Default, Deserialize)]
pub struct OrderParams {
    pub status: Option<String>,
}

impl OrderParams {
    pub(super) fn status(&self) -> Result<Option<OrderStatus>> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()
            .map_err(AppError::Validation)
    }
}

/// `GET /api/orders`
///
/// A shopper sees their own orders; an admin sees every order.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<OrderParams>,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool())
        .list_for(&user, params.status()?)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_id(&id, "order")?;
    let order = OrderService::new(state.pool()).get_for(&user, id).await?;
    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_param() {
        let params = OrderParams {
            status: Some("shipped".to_string()),
        };
        assert_eq!(params.status().unwrap(), Some(OrderStatus::Shipped));

        let params = OrderParams {
            status: Some(" ".to_string()),
        };
        assert_eq!(params.status().unwrap(), None);

        let params = OrderParams {
            status: Some("lost".to_string()),
        };
        assert!(params.status().is_err());
    }
}
