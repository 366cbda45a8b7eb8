//! Order viewing and admin order management.

use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use animix_core::{Order, OrderError, OrderId, OrderStatus, PaymentResult};

use crate::db::orders::OrderTotals;
use crate::db::{OrderFilter, OrderRepository, RepositoryError};
use crate::models::CurrentUser;

/// Errors from order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderServiceError {
    #[error("Order not found")]
    NotFound,
    #[error("Not authorized to view this order")]
    Forbidden,
    #[error(transparent)]
    Invalid(#[from] OrderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Order service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Orders visible to `viewer`: their own, or every order for an admin.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` if the store fails.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.id))]
    pub async fn list_for(
        &self,
        viewer: &CurrentUser,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderServiceError> {
        let filter = OrderFilter {
            user_id: (!viewer.is_admin()).then_some(viewer.id),
            status,
        };
        Ok(self.orders.list(filter).await?)
    }

    /// A single order, if `viewer` owns it or is an admin.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::NotFound` or `OrderServiceError::Forbidden`.
    #[instrument(skip(self, viewer), fields(user_id = %viewer.id))]
    pub async fn get_for(
        &self,
        viewer: &CurrentUser,
        id: OrderId,
    ) -> Result<Order, OrderServiceError> {
        let order = self.load(id).await?;
        ensure_can_view(viewer, &order)?;
        Ok(order)
    }

    /// Move an order along the status state machine.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Invalid` for a transition the state
    /// machine forbids, `OrderServiceError::NotFound` for an unknown order.
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        let mut order = self.load(id).await?;
        let previous = order.status;
        order.transition(next, Utc::now())?;
        self.orders.save_status(&order, previous).await?;
        tracing::info!(from = %previous, to = %next, "Order status changed");
        Ok(order)
    }

    /// Record payment confirmed outside the checkout flow.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Invalid` if the order is already paid.
    #[instrument(skip(self, result))]
    pub async fn mark_paid(
        &self,
        id: OrderId,
        result: Option<PaymentResult>,
    ) -> Result<Order, OrderServiceError> {
        let mut order = self.load(id).await?;
        order.mark_paid(result, Utc::now())?;
        self.orders.save_payment(&order).await?;
        tracing::info!("Order marked paid");
        Ok(order)
    }

    /// Count and revenue over every order, paid or not.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` if the store fails.
    pub async fn totals(&self) -> Result<OrderTotals, OrderServiceError> {
        Ok(self.orders.totals().await?)
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderServiceError> {
        self.orders
            .get(id)
            .await?
            .ok_or(OrderServiceError::NotFound)
    }
}

fn ensure_can_view(viewer: &CurrentUser, order: &Order) -> Result<(), OrderServiceError> {
    if viewer.is_admin() || order.is_owned_by(viewer.id) {
        Ok(())
    } else {
        Err(OrderServiceError::Forbidden)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use animix_core::{
        CartLine, Email, OrderDraft, ProductId, Role, ShippingAddress, UserId,
    };

    use super::*;

    fn order_for(owner: i32) -> Order {
        let line = CartLine {
            product_id: ProductId::new(1),
            size: None,
            color: None,
            quantity: 1,
            unit_price: "10.00".parse().unwrap(),
            stock_ceiling: 3,
            name: "Pin".to_string(),
            image: "/img/pin.jpg".to_string(),
        };
        let address = ShippingAddress {
            full_name: "Zoro".to_string(),
            address: "Lost".to_string(),
            city: "Somewhere".to_string(),
            postal_code: "0".to_string(),
            country: "Wano".to_string(),
        };
        let draft = OrderDraft::from_cart(UserId::new(owner), &[line], address).unwrap();
        Order::from_draft(OrderId::new(1), draft, Utc::now())
    }

    fn viewer(id: i32, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            name: "Viewer".to_string(),
            email: Email::parse("viewer@animix.shop").unwrap(),
            role,
        }
    }

    #[test]
    fn test_owner_can_view() {
        assert!(ensure_can_view(&viewer(5, Role::User), &order_for(5)).is_ok());
    }

    #[test]
    fn test_other_user_is_forbidden() {
        assert!(matches!(
            ensure_can_view(&viewer(6, Role::User), &order_for(5)),
            Err(OrderServiceError::Forbidden)
        ));
    }

    #[test]
    fn test_admin_can_view_any() {
        assert!(ensure_can_view(&viewer(1, Role::Admin), &order_for(5)).is_ok());
    }
}
